//! Command dispatch
//!
//! Two command forms share one entry point: the env-resolving form fills in
//! the missing version from the environment and then calls straight into
//! the explicit-version handler, so both the CLI path and the delegated
//! path go through the same validation gate before anything executes.

use tracing::error;

use crate::install::{execute, InstallContext, InstallRequest, Registry};
use crate::version;

/// The two command shapes the CLI can land on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallCommand {
    /// No explicit version; resolve it from the environment
    Env {
        registry: Registry,
        name: String,
        dry_run: bool,
    },
    /// Version supplied explicitly; the resolver is never consulted
    Explicit(InstallRequest),
}

/// Dispatch a command and return the process exit code
pub async fn dispatch(ctx: &InstallContext, command: InstallCommand) -> u8 {
    match command {
        InstallCommand::Env {
            registry,
            name,
            dry_run,
        } => match version::resolve(&name) {
            Some(resolved) => {
                run_explicit(
                    ctx,
                    InstallRequest {
                        name,
                        version: resolved,
                        dry_run,
                        registry,
                    },
                )
                .await
            }
            None => {
                error!("No version found for {name}");
                1
            }
        },
        InstallCommand::Explicit(request) => run_explicit(ctx, request).await,
    }
}

/// Explicit-version handler: validate, then hand off to the executor
///
/// A validation failure stops here; no start or timing lines are emitted.
async fn run_explicit(ctx: &InstallContext, request: InstallRequest) -> u8 {
    if let Err(err) = version::validate(&request.version) {
        error!("{err}");
        return 1;
    }
    execute(ctx, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::tests::{capture_logs, RecordingInstaller};
    use std::sync::Arc;

    fn ctx_with(installer: Arc<RecordingInstaller>) -> InstallContext {
        InstallContext::new(installer)
    }

    #[tokio::test]
    async fn test_env_form_resolves_and_delegates() {
        std::env::set_var("DISPATCH_RESOLVED_TOOL_VERSION", "5.0.0");
        let installer = Arc::new(RecordingInstaller::succeeding());
        let code = dispatch(
            &ctx_with(installer.clone()),
            InstallCommand::Env {
                registry: Registry::Npm,
                name: "dispatch-resolved-tool".to_string(),
                dry_run: false,
            },
        )
        .await;

        assert_eq!(code, 0);
        let calls = installer.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[InstallRequest {
                name: "dispatch-resolved-tool".to_string(),
                version: "5.0.0".to_string(),
                dry_run: false,
                registry: Registry::Npm,
            }]
        );
    }

    #[tokio::test]
    async fn test_env_form_matches_explicit_form() {
        std::env::set_var("DISPATCH_EQUIV_TOOL_VERSION", "2.1.0");

        let env_installer = Arc::new(RecordingInstaller::succeeding());
        let env_code = dispatch(
            &ctx_with(env_installer.clone()),
            InstallCommand::Env {
                registry: Registry::Npm,
                name: "dispatch-equiv-tool".to_string(),
                dry_run: true,
            },
        )
        .await;

        let explicit_installer = Arc::new(RecordingInstaller::succeeding());
        let explicit_code = dispatch(
            &ctx_with(explicit_installer.clone()),
            InstallCommand::Explicit(InstallRequest {
                name: "dispatch-equiv-tool".to_string(),
                version: "2.1.0".to_string(),
                dry_run: true,
                registry: Registry::Npm,
            }),
        )
        .await;

        assert_eq!(env_code, explicit_code);
        assert_eq!(
            env_installer.calls.lock().unwrap().as_slice(),
            explicit_installer.calls.lock().unwrap().as_slice()
        );
    }

    #[tokio::test]
    async fn test_env_form_unresolved_never_installs() {
        let installer = Arc::new(RecordingInstaller::succeeding());
        let code = dispatch(
            &ctx_with(installer.clone()),
            InstallCommand::Env {
                registry: Registry::Npm,
                name: "dispatch-unset-tool".to_string(),
                dry_run: false,
            },
        )
        .await;

        assert_eq!(code, 1);
        assert!(installer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_form_invalid_version_never_installs() {
        let installer = Arc::new(RecordingInstaller::succeeding());
        let code = dispatch(
            &ctx_with(installer.clone()),
            InstallCommand::Explicit(InstallRequest {
                name: "bar".to_string(),
                version: "not-a-version".to_string(),
                dry_run: false,
                registry: Registry::Npm,
            }),
        )
        .await;

        assert_ne!(code, 0);
        assert!(installer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_env_form_rejects_unparseable_resolved_version() {
        std::env::set_var("DISPATCH_BAD_ENV_TOOL_VERSION", "latest");
        let installer = Arc::new(RecordingInstaller::succeeding());
        let code = dispatch(
            &ctx_with(installer.clone()),
            InstallCommand::Env {
                registry: Registry::Npm,
                name: "dispatch-bad-env-tool".to_string(),
                dry_run: false,
            },
        )
        .await;

        assert_eq!(code, 1);
        assert!(installer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_propagates_through_delegation() {
        std::env::set_var("DISPATCH_DRY_TOOL_VERSION", "1.0.0");

        for dry_run in [true, false] {
            let installer = Arc::new(RecordingInstaller::succeeding());
            dispatch(
                &ctx_with(installer.clone()),
                InstallCommand::Env {
                    registry: Registry::Npm,
                    name: "dispatch-dry-tool".to_string(),
                    dry_run,
                },
            )
            .await;

            let calls = installer.calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].dry_run, dry_run);
        }
    }

    #[tokio::test]
    async fn test_unresolved_version_emits_no_timing_lines() {
        let (logs, _guard) = capture_logs();
        let installer = Arc::new(RecordingInstaller::succeeding());
        dispatch(
            &ctx_with(installer),
            InstallCommand::Env {
                registry: Registry::Npm,
                name: "dispatch-silent-tool".to_string(),
                dry_run: false,
            },
        )
        .await;

        let contents = logs.contents();
        assert!(contents.contains("No version found for dispatch-silent-tool"));
        assert!(!contents.contains("Installing"));
        assert!(!contents.contains("Installed"));
    }

    #[tokio::test]
    async fn test_invalid_version_emits_no_timing_lines() {
        let (logs, _guard) = capture_logs();
        let installer = Arc::new(RecordingInstaller::succeeding());
        dispatch(
            &ctx_with(installer),
            InstallCommand::Explicit(InstallRequest {
                name: "bar".to_string(),
                version: "not-a-version".to_string(),
                dry_run: false,
                registry: Registry::Npm,
            }),
        )
        .await;

        let contents = logs.contents();
        assert!(contents.contains("invalid version 'not-a-version'"));
        assert!(!contents.contains("Installing"));
        assert!(!contents.contains("Installed"));
    }

    #[tokio::test]
    async fn test_explicit_form_install_failure_exits_one() {
        let installer = Arc::new(RecordingInstaller::failing("registry unreachable"));
        let code = dispatch(
            &ctx_with(installer.clone()),
            InstallCommand::Explicit(InstallRequest {
                name: "del-cli".to_string(),
                version: "5.0.0".to_string(),
                dry_run: false,
                registry: Registry::Npm,
            }),
        )
        .await;

        assert_eq!(code, 1);
        assert_eq!(installer.calls.lock().unwrap().len(), 1);
    }
}
