use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use crate::errors::RepositoryError;
use anyhow::Context;
use derive_new::new;

pub const REF_PREFIX: &str = "refs/heads/";

/// Full name of a ref relative to the git directory (`HEAD`,
/// `refs/heads/master`, `refs/remotes/origin/topic`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn head() -> Self {
        SymRefName("HEAD".to_string())
    }

    pub fn for_branch(branch_name: &BranchName) -> Self {
        SymRefName(format!("{REF_PREFIX}{branch_name}"))
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    /// The branch this ref names, when it lives under `refs/heads/`.
    pub fn branch_name(&self) -> Option<BranchName> {
        self.0
            .strip_prefix(REF_PREFIX)
            .and_then(|name| BranchName::try_parse(name.to_string()).ok())
    }
}

impl std::fmt::Display for SymRefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            return Err(RepositoryError::InvalidBranchName(name).into());
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        if re.is_match(&name) {
            Err(RepositoryError::InvalidBranchName(name).into())
        } else {
            Ok(Self(name))
        }
    }

    pub fn is_default_branch(&self) -> bool {
        self.0 == "master" || self.0 == "main"
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    proptest! {
        #[test]
        fn test_is_valid_branch_name_with_valid_branch_name(
            branch_name in "[a-zA-Z0-9_-]+"
        ) {
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_valid_branch_name_with_slashes(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}/{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_invalid_branch_name_starting_with_dot(
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!(".{}", suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_ending_with_lock(
            prefix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}.lock", prefix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_consecutive_dots(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}..{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_special_chars(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~ ]"
        ) {
            let branch_name = format!("{}{}{}", prefix, special_char, suffix);
            let error = BranchName::try_parse(branch_name).unwrap_err();
            assert!(matches!(
                RepositoryError::find(&error),
                Some(RepositoryError::InvalidBranchName(_))
            ));
        }
    }

    #[test]
    fn test_is_invalid_branch_name_empty() {
        assert!(BranchName::try_parse("".to_string()).is_err());
    }

    #[test]
    fn test_is_valid_branch_name_with_path() {
        assert!(BranchName::try_parse("feature/new-feature".to_string()).is_ok());
        assert!(BranchName::try_parse("bugfix/issue-123".to_string()).is_ok());
    }

    #[test]
    fn sym_ref_name_knows_its_branch() {
        let branch = BranchName::try_parse("topic/x".to_string()).unwrap();
        let sym_ref = SymRefName::for_branch(&branch);

        assert_eq!(sym_ref.as_ref_path(), "refs/heads/topic/x");
        assert_eq!(sym_ref.branch_name(), Some(branch));
        assert_eq!(SymRefName::head().branch_name(), None);
    }
}
