//! SSH identity check against the hosting service.

use crate::constants::SSH_CHECK_TIMEOUT;
use crate::runner::CommandRunner;

/// Which stream carried the greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreetingStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for GreetingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "STDOUT"),
            Self::Stderr => write!(f, "STDERR"),
        }
    }
}

fn expected_greeting(user: &str) -> String {
    format!("Hi {user}! You've successfully authenticated, but GitHub does not provide shell access.")
}

/// Runs `ssh -T git@<alias>` and requires the greeting for `user`.
///
/// The exit code is ignored: the service closes the session with a non-zero
/// status even when authentication succeeds.
pub fn verify_access(
    runner: &dyn CommandRunner,
    user: &str,
    alias: &str,
) -> anyhow::Result<GreetingStream> {
    let host = format!("git@{alias}");
    let output = runner.run(&["ssh", "-T", host.as_str()], None, SSH_CHECK_TIMEOUT);
    let expected = expected_greeting(user);

    if output.stdout.contains(&expected) {
        Ok(GreetingStream::Stdout)
    } else if output.stderr.contains(&expected) {
        Ok(GreetingStream::Stderr)
    } else {
        anyhow::bail!(
            "SSH authentication failed or wrong user/alias:\nSSH returned code {}\nSTDOUT:\n{}\nSTDERR:\n{}",
            output.code,
            output.stdout,
            output.stderr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;

    #[test]
    fn test_greeting_on_stderr_is_accepted() {
        let runner =
            ScriptedRunner::new().stderr("ssh -T git@github-work", 1, &expected_greeting("alice"));
        assert_eq!(
            verify_access(&runner, "alice", "github-work").unwrap(),
            GreetingStream::Stderr
        );
    }

    #[test]
    fn test_greeting_on_stdout_is_accepted() {
        let runner = ScriptedRunner::new().ok("ssh -T git@gh", &expected_greeting("alice"));
        assert_eq!(
            verify_access(&runner, "alice", "gh").unwrap(),
            GreetingStream::Stdout
        );
    }

    #[test]
    fn test_wrong_user_is_rejected() {
        let runner = ScriptedRunner::new().ok("ssh -T git@gh", &expected_greeting("bob"));
        let err = verify_access(&runner, "alice", "gh").unwrap_err();
        assert!(err.to_string().contains("wrong user/alias"));
    }

    #[test]
    fn test_unreachable_host_is_rejected() {
        let runner = ScriptedRunner::new().fail("ssh -T git@gh");
        assert!(verify_access(&runner, "alice", "gh").is_err());
    }
}
