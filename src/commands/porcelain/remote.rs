use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::errors::RepositoryError;

/// Options for `remote add`.
#[derive(Debug, Clone, Default)]
pub struct RemoteAddOptions {
    /// Track only this branch instead of every branch of the remote
    pub track: Option<String>,
    /// Point `refs/remotes/<name>/HEAD` at this branch of the remote
    pub master: Option<String>,
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: Option<String>,
    pub fetch: Option<String>,
}

/// Fetch refspec mapping the remote's branches (or just `track`) under
/// `refs/remotes/<name>/`.
pub fn fetch_refspec(name: &str, track: Option<&str>) -> String {
    let branch = track.unwrap_or("*");
    format!("+refs/heads/{branch}:refs/remotes/{name}/{branch}")
}

impl Repository {
    /// Record a new remote in the config. Nothing is fetched.
    pub fn remote_add(&self, name: &str, url: &str, options: &RemoteAddOptions) -> anyhow::Result<Remote> {
        if BranchName::try_parse(name.to_string()).is_err() {
            return Err(RepositoryError::InvalidRemoteName(name.to_string()).into());
        }
        if let Some(track) = &options.track {
            BranchName::try_parse(track.clone())?;
        }
        let master = options
            .master
            .as_ref()
            .map(|master| BranchName::try_parse(master.clone()))
            .transpose()?;

        let mut config = self.config()?;
        if config.get_string(&format!("remote.{name}.url")).is_ok() {
            return Err(RepositoryError::RemoteExists(name.to_string()).into());
        }

        let fetch = fetch_refspec(name, options.track.as_deref());
        config.set_string(&format!("remote.{name}.url"), url)?;
        config.set_string(&format!("remote.{name}.fetch"), &fetch)?;
        config.save()?;

        if let Some(master) = master {
            self.refs().set_symbolic(
                &SymRefName::new(format!("refs/remotes/{name}/HEAD")),
                &SymRefName::new(format!("refs/remotes/{name}/{master}")),
            )?;
        }

        tracing::debug!(remote = name, url, fetch = %fetch, "added remote");
        Ok(Remote {
            name: name.to_string(),
            url: Some(url.to_string()),
            fetch: Some(fetch),
        })
    }

    /// Every `[remote "..."]` in the config, in file order.
    pub fn remotes(&self) -> anyhow::Result<Vec<Remote>> {
        let config = self.config()?;

        Ok(config
            .subsections("remote")
            .into_iter()
            .map(|name| Remote {
                url: config.get_string(&format!("remote.{name}.url")).ok(),
                fetch: config.get_string(&format!("remote.{name}.fetch")).ok(),
                name,
            })
            .collect())
    }
}
