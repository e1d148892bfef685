//! Git operations used by project creation and the install bootstrap

use std::io;
use std::path::Path;

use super::{ExitStatus, ExternalCommand, ProcessRunner};

/// Thin git front end over a [`ProcessRunner`]
pub struct GitClient<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> GitClient<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// `git init` inside `dir`
    pub fn init(&self, dir: &Path) -> io::Result<ExitStatus> {
        self.runner
            .run(&ExternalCommand::new("git").arg("init").current_dir(dir))
    }

    /// `git clone <url> <dest>`
    pub fn clone_repo(&self, url: &str, dest: &Path) -> io::Result<ExitStatus> {
        self.runner.run(
            &ExternalCommand::new("git")
                .arg("clone")
                .arg(url)
                .arg(dest.to_string_lossy()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<ExternalCommand>>,
    }

    impl ProcessRunner for Recorder {
        fn run(&self, command: &ExternalCommand) -> io::Result<ExitStatus> {
            self.seen.borrow_mut().push(command.clone());
            Ok(ExitStatus::from_code(0))
        }
    }

    #[test]
    fn test_init_runs_in_project_dir() {
        let recorder = Recorder::default();
        let git = GitClient::new(&recorder);
        let status = git.init(Path::new("/work/Rust/tool")).unwrap();
        assert!(status.success());

        let seen = recorder.seen.borrow();
        assert_eq!(seen[0].to_string(), "git init");
        assert_eq!(seen[0].cwd, Some(PathBuf::from("/work/Rust/tool")));
    }

    #[test]
    fn test_clone_arguments() {
        let recorder = Recorder::default();
        GitClient::new(&recorder)
            .clone_repo("https://example.com/r.git", Path::new("/tmp/dest"))
            .unwrap();
        assert_eq!(
            recorder.seen.borrow()[0].args,
            vec!["clone", "https://example.com/r.git", "/tmp/dest"]
        );
    }
}
