//! Built-in phase types.

mod approval;
mod codebuild;
mod codecommit;
mod common;
mod github;
mod handel;
mod runscope;

pub use approval::ApprovalPhase;
pub use codebuild::CodeBuildPhase;
pub use codecommit::CodeCommitPhase;
pub use github::{GitHubPhase, GITHUB_TOKEN_SECRET};
pub use handel::{HandelPhase, DEPLOY_PHASE_ROLE};
pub use runscope::{RunscopePhase, ACCESS_TOKEN_SECRET, RUNSCOPE_ROLE, TRIGGER_URL_SECRET};
