//! Repository configuration file (`<root>/config`)
//!
//! Git-style INI syntax:
//!
//! ```text
//! [core]
//!     bare = false
//! [remote "origin"]
//!     url = /srv/repo.git
//! ```
//!
//! Section and key names are case-insensitive, subsection names are not.
//! Keys are addressed as `section.key` or `section.subsection.key`. Each key
//! holds a single value; when a file repeats a key the last one wins.

use crate::artifacts::core::lockfile::LockFile;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

const SECTION_REGEX: &str = r#"^\[\s*([A-Za-z0-9.-]+)(?:\s+"((?:[^"\\]|\\.)*)")?\s*\]$"#;
const ENTRY_REGEX: &str = r"^([A-Za-z][A-Za-z0-9-]*)\s*(?:=\s*(.*))?$";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    subsection: Option<String>,
    entries: Vec<(String, String)>,
}

impl Section {
    fn matches(&self, name: &str, subsection: Option<&str>) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.subsection.as_deref() == subsection
    }
}

/// A parsed `section[.subsection].key` address.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigKey<'k> {
    section: &'k str,
    subsection: Option<&'k str>,
    name: &'k str,
}

impl<'k> ConfigKey<'k> {
    fn parse(key: &'k str) -> anyhow::Result<Self> {
        let invalid = || RepositoryError::ConfigKeyNotFound(key.to_string());

        let (section, rest) = key.split_once('.').ok_or_else(invalid)?;
        let (subsection, name) = match rest.rsplit_once('.') {
            Some((subsection, name)) => (Some(subsection), name),
            None => (None, rest),
        };

        if section.is_empty() || name.is_empty() {
            return Err(invalid().into());
        }

        Ok(ConfigKey {
            section,
            subsection,
            name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    sections: Vec<Section>,
}

impl Config {
    /// Parse the config file; a missing file is an empty config.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("Unable to read config {}", path.display())));
            }
        };

        let sections = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(Config { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(content: &str) -> anyhow::Result<Vec<Section>> {
        let section_regex = regex::Regex::new(SECTION_REGEX)?;
        let entry_regex = regex::Regex::new(ENTRY_REGEX)?;

        let mut sections: Vec<Section> = Vec::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(captures) = section_regex.captures(line) {
                sections.push(Section {
                    name: captures[1].to_ascii_lowercase(),
                    subsection: captures.get(2).map(|sub| unescape(sub.as_str())),
                    entries: Vec::new(),
                });
                continue;
            }

            let captures = entry_regex
                .captures(line)
                .with_context(|| format!("line {}: cannot parse '{line}'", number + 1))?;
            let section = sections
                .last_mut()
                .with_context(|| format!("line {}: key outside of a section", number + 1))?;

            // a bare key is a boolean true
            let value = captures
                .get(2)
                .map(|value| parse_value(value.as_str()))
                .unwrap_or_else(|| "true".to_string());
            section
                .entries
                .push((captures[1].to_ascii_lowercase(), value));
        }

        Ok(sections)
    }

    pub fn get_string(&self, key: &str) -> anyhow::Result<String> {
        let config_key = ConfigKey::parse(key)?;

        self.sections
            .iter()
            .filter(|section| section.matches(config_key.section, config_key.subsection))
            .flat_map(|section| section.entries.iter())
            .filter(|(name, _)| name.eq_ignore_ascii_case(config_key.name))
            .map(|(_, value)| value.clone())
            .last()
            .ok_or_else(|| RepositoryError::ConfigKeyNotFound(key.to_string()).into())
    }

    pub fn get_bool(&self, key: &str) -> anyhow::Result<bool> {
        let value = self.get_string(key)?;
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" | "" => Ok(false),
            _ => anyhow::bail!("bad boolean config value '{value}' for '{key}'"),
        }
    }

    /// Names of the `[section "name"]` blocks for `section`, in file order.
    pub fn subsections(&self, section: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for subsection in self
            .sections
            .iter()
            .filter(|candidate| candidate.name.eq_ignore_ascii_case(section))
            .filter_map(|candidate| candidate.subsection.as_ref())
        {
            if !names.contains(subsection) {
                names.push(subsection.clone());
            }
        }
        names
    }

    /// Set a value in memory; call [`Config::save`] to persist.
    pub fn set_string(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let config_key = ConfigKey::parse(key)?;
        let name = config_key.name.to_ascii_lowercase();

        let position = self
            .sections
            .iter()
            .rposition(|section| section.matches(config_key.section, config_key.subsection));
        let section = match position {
            Some(position) => &mut self.sections[position],
            None => {
                self.sections.push(Section {
                    name: config_key.section.to_ascii_lowercase(),
                    subsection: config_key.subsection.map(str::to_string),
                    entries: Vec::new(),
                });
                let last = self.sections.len() - 1;
                &mut self.sections[last]
            }
        };

        section.entries.retain(|(existing, _)| *existing != name);
        section.entries.push((name, value.to_string()));

        Ok(())
    }

    /// Rewrite the whole file through `config.lock`. Comments are not kept.
    pub fn save(&self) -> anyhow::Result<()> {
        let mut lock = LockFile::acquire(&self.path)?;
        lock.write_all(self.to_string().as_bytes())?;
        lock.commit()
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for section in &self.sections {
            match &section.subsection {
                Some(subsection) => writeln!(f, "[{} \"{}\"]", section.name, escape(subsection))?,
                None => writeln!(f, "[{}]", section.name)?,
            }
            for (name, value) in &section.entries {
                writeln!(f, "\t{name} = {}", format_value(value))?;
            }
        }

        Ok(())
    }
}

/// Strip an unquoted trailing comment, surrounding quotes and escapes.
fn parse_value(raw: &str) -> String {
    let mut value = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars();
    // whitespace is only kept when quoted
    let mut pending_space = String::new();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                value.push_str(&pending_space);
                pending_space.clear();
            }
            '\\' => {
                value.push_str(&pending_space);
                pending_space.clear();
                match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => {}
                }
            }
            '#' | ';' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => {
                if !value.is_empty() {
                    pending_space.push(c);
                }
            }
            c => {
                value.push_str(&pending_space);
                pending_space.clear();
                value.push(c);
            }
        }
    }

    value
}

fn unescape(raw: &str) -> String {
    let mut value = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.extend(chars.next()),
            c => value.push(c),
        }
    }
    value
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn format_value(value: &str) -> String {
    let needs_quotes = value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['#', ';']);
    let escaped = escape(value).replace('\n', "\\n").replace('\t', "\\t");

    match needs_quotes {
        true => format!("\"{escaped}\""),
        false => escaped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SAMPLE: &str = r#"# written by hand
[core]
	repositoryformatversion = 0
	Bare = false ; trailing comment
[remote "origin"]
	url = /srv/repos/project.git
	fetch = +refs/heads/*:refs/remotes/origin/*
[user]
	name = "Ada  Lovelace"
	email = ada@example.com
[alias]
	quoted = "say \"hi\" # not a comment"
	flag
"#;

    fn sample() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        dir.child("config").write_str(SAMPLE).unwrap();
        let config = Config::load(dir.path().join("config")).unwrap();
        (dir, config)
    }

    #[rstest]
    #[case("core.repositoryformatversion", "0")]
    #[case("CORE.bare", "false")]
    #[case("remote.origin.url", "/srv/repos/project.git")]
    #[case("remote.origin.fetch", "+refs/heads/*:refs/remotes/origin/*")]
    #[case("user.name", "Ada  Lovelace")]
    #[case("alias.quoted", "say \"hi\" # not a comment")]
    #[case("alias.flag", "true")]
    fn values_are_read(#[case] key: &str, #[case] expected: &str) {
        let (_dir, config) = sample();
        assert_eq!(config.get_string(key).unwrap(), expected);
    }

    #[rstest]
    #[case("remote.Origin.url")]
    #[case("core.missing")]
    #[case("nodots")]
    fn missing_keys_are_reported(#[case] key: &str) {
        let (_dir, config) = sample();
        let error = config.get_string(key).unwrap_err();
        assert_eq!(
            RepositoryError::find(&error),
            Some(&RepositoryError::ConfigKeyNotFound(key.to_string()))
        );
    }

    #[test]
    fn saved_values_read_back() {
        let (dir, mut config) = sample();
        config.set_string("core.bare", "true").unwrap();
        config.set_string("remote.upstream.url", "/other path").unwrap();
        config.set_string("user.name", " padded ").unwrap();
        config.save().unwrap();

        let reloaded = Config::load(dir.path().join("config")).unwrap();
        assert!(reloaded.get_bool("core.bare").unwrap());
        assert_eq!(reloaded.get_string("remote.upstream.url").unwrap(), "/other path");
        assert_eq!(reloaded.get_string("user.name").unwrap(), " padded ");
        assert_eq!(
            reloaded.get_string("alias.quoted").unwrap(),
            "say \"hi\" # not a comment"
        );
    }

    #[test]
    fn subsections_are_listed_once_in_file_order() {
        let dir = TempDir::new().unwrap();
        dir.child("config")
            .write_str("[remote \"upstream\"]\n\turl = a\n[remote \"origin\"]\n\turl = b\n[Remote \"upstream\"]\n\tfetch = c\n[branch \"master\"]\n\tremote = origin\n")
            .unwrap();
        let config = Config::load(dir.path().join("config")).unwrap();

        assert_eq!(config.subsections("remote"), vec!["upstream", "origin"]);
        assert_eq!(config.subsections("branch"), vec!["master"]);
        assert!(config.subsections("user").is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("config")).unwrap();
        assert!(config.get_string("core.bare").is_err());
    }

    #[test]
    fn keys_outside_a_section_are_rejected() {
        let dir = TempDir::new().unwrap();
        dir.child("config").write_str("orphan = 1\n").unwrap();
        assert!(Config::load(dir.path().join("config")).is_err());
    }
}
