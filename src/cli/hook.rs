use std::path::Path;

use crate::error::Result;
use crate::hook::{HookController, HookOutcome};
use crate::runner;

/// Exit status after an interrupt outside the review phase (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

/// Run the Stop hook against the process's stdin/stdout.
///
/// Ctrl-C during the review kills the review subprocess and fails the
/// invocation; at any other point it ends the process right away.
pub async fn run_hook(config_path: &Path) -> Result<HookOutcome> {
    let controller = HookController::new(config_path, runner::is_review_subprocess());
    let mut stdout = std::io::stdout();

    let run = controller.run(tokio::io::stdin(), &mut stdout);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            if !controller.review_active() {
                eprintln!("cc-supervisor: interrupted");
                std::process::exit(INTERRUPTED_EXIT);
            }
            eprintln!("cc-supervisor: interrupted, stopping review");
            controller.cancel_review();
            run.await
        }
    }
}
