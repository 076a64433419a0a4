use crate::areas::repository::Repository;

/// One `config` invocation: read a key, or write one.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub get: Option<String>,
    pub set: Option<(String, String)>,
}

impl Repository {
    /// Returns the value read, or the value written.
    pub fn config_command(&self, options: &ConfigOptions) -> anyhow::Result<String> {
        match (&options.get, &options.set) {
            (Some(key), None) => self.config()?.get_string(key),
            (None, Some((key, value))) => {
                let mut config = self.config()?;
                config.set_string(key, value)?;
                config.save()?;
                Ok(value.clone())
            }
            _ => anyhow::bail!("exactly one of --get or <key> <value> is required"),
        }
    }
}
