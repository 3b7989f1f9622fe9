//! Parser for the legacy `Modulefile` format.
//!
//! Only the statements that matter for resolution are interpreted:
//!
//! ```text
//! name    'acme-ntp'
//! version '1.2.0'
//! dependency 'puppetlabs/stdlib', '>= 2.2.1'
//! ```
//!
//! Other statements (`summary`, `license`, ...) are ignored.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::reader::ModuleDescriptor;
use super::ANY_REQUIREMENT;

lazy_static! {
    static ref STATEMENT_RE: Regex = Regex::new(r"^\s*([a-z_]+)[\s(]+(.*)$").unwrap();
    static ref STRING_RE: Regex = Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap();
}

fn string_args(rest: &str) -> Vec<String> {
    STRING_RE
        .captures_iter(rest)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn parse_modulefile(contents: &str) -> Result<ModuleDescriptor, String> {
    let mut descriptor = ModuleDescriptor {
        dependencies: IndexMap::new(),
        ..Default::default()
    };

    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(caps) = STATEMENT_RE.captures(line) else {
            continue;
        };
        let args = string_args(&caps[2]);

        match &caps[1] {
            "name" => descriptor.name = args.into_iter().next(),
            "version" => descriptor.version = args.into_iter().next(),
            "dependency" => {
                let mut args = args.into_iter();
                let name = args
                    .next()
                    .ok_or_else(|| format!("line {}: dependency without a name", lineno + 1))?;
                let requirement = args.next().unwrap_or_else(|| ANY_REQUIREMENT.to_string());
                descriptor.dependencies.insert(name, requirement);
            }
            _ => {}
        }
    }

    Ok(descriptor)
}
