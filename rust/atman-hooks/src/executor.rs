// Hook executor: runs one handler on its own thread under a wall-clock
// budget, catches panics, and sanitizes every failure

use crate::error::HookError;
use crate::sanitize::{kind, SanitizedError};
use crate::types::{Hook, HookContext, HookResult};
use crate::view::StoreView;
use atman_store::QuadDelta;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Evaluate one hook. The handler runs on a dedicated thread; if it
/// outlives `effective_timeout_ms` the result is discarded and the
/// invocation is recorded as a timeout failure. Panics and raised
/// errors are caught and pass through the sanitizer — the caller
/// always gets a `HookResult`.
pub fn execute_hook(
    hook: &Hook,
    view: StoreView,
    delta: &QuadDelta,
    context: &HookContext,
) -> HookResult {
    let started = Instant::now();
    let handler = hook.handler.clone();
    let delta = delta.clone();
    let context = context.clone();
    let (tx, rx) = mpsc::channel();

    let spawn = std::thread::Builder::new()
        .name(format!("hook-{}", hook.id))
        .spawn(move || {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler.invoke(&view, &delta, &context)
            }));
            // Receiver may be gone after a timeout; nothing to do then
            let _ = tx.send(outcome);
        });

    if let Err(e) = spawn {
        return failure(
            hook,
            started,
            SanitizedError::for_hook(kind::STORE_ERROR, &format!("spawn failed: {e}"), &hook.id),
        );
    }

    let budget = Duration::from_millis(hook.effective_timeout_ms());
    match rx.recv_timeout(budget) {
        Ok(Ok(Ok(outcome))) => HookResult {
            hook_id: hook.id.clone(),
            success: outcome.success,
            duration_ns: started.elapsed().as_nanos() as u64,
            error: None,
            output: outcome.output,
        },
        Ok(Ok(Err(raised))) => {
            let error_kind = match &raised {
                HookError::SandboxBreach(_) => kind::SANDBOX_BREACH,
                HookError::Store(atman_store::StoreError::Query(_)) => kind::QUERY_ERROR,
                HookError::Store(_) => kind::STORE_ERROR,
                _ => kind::HOOK_FAILED,
            };
            tracing::warn!(hook = %hook.id, error = %raised, "hook raised");
            failure(
                hook,
                started,
                SanitizedError::for_hook(error_kind, &raised.to_string(), &hook.id),
            )
        }
        Ok(Err(panic)) => {
            let message = panic_message(&panic);
            tracing::warn!(hook = %hook.id, message = %message, "hook panicked");
            failure(
                hook,
                started,
                SanitizedError::for_hook(kind::HOOK_PANIC, &message, &hook.id),
            )
        }
        Err(_) => {
            tracing::warn!(hook = %hook.id, budget_ms = budget.as_millis() as u64, "hook timed out");
            failure(
                hook,
                started,
                SanitizedError::for_hook(
                    kind::HOOK_TIMEOUT,
                    &format!("exceeded wall budget of {}ms", budget.as_millis()),
                    &hook.id,
                ),
            )
        }
    }
}

/// Evaluate hooks sequentially in the given order, stopping after the
/// first failure when `stop_on_failure` is set (the PRE guard
/// discipline). Returns the results gathered so far either way.
pub fn execute_hooks<'a>(
    hooks: impl Iterator<Item = &'a Hook>,
    view: &StoreView,
    delta: &QuadDelta,
    context: &HookContext,
    stop_on_failure: bool,
) -> Vec<HookResult> {
    let mut results = Vec::new();
    for hook in hooks {
        let result = execute_hook(hook, view.clone(), delta, context);
        let failed = !result.success;
        results.push(result);
        if failed && stop_on_failure {
            break;
        }
    }
    results
}

fn failure(hook: &Hook, started: Instant, error: SanitizedError) -> HookResult {
    HookResult {
        hook_id: hook.id.clone(),
        success: false,
        duration_ns: started.elapsed().as_nanos() as u64,
        error: Some(error),
        output: None,
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
