//! Sign-in wall detection and hand-off to a human operator.
//!
//! Some categories are only readable after logging in. When the start page
//! shows a sign-in form the run pauses until the operator has signed in
//! inside the (non-headless) browser window and confirms on stdin.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use super::PageSession;

/// Default indicator: a password field on the start page.
pub const DEFAULT_SIGN_IN_SELECTOR: &str = r#"input[type="password"]"#;

/// Number of sign-in indicators on the current page.
///
/// # Errors
///
/// Returns an error if the page cannot be queried.
pub async fn sign_in_indicators<S: PageSession + ?Sized>(session: &S, selector: &str) -> Result<usize> {
    session
        .count(selector)
        .await
        .context("Failed to query sign-in indicator")
}

/// Block until the operator sends a line (typically just Enter).
///
/// # Errors
///
/// Returns an error if the input closes before a line arrives.
pub async fn wait_for_operator<R: AsyncBufRead + Unpin>(input: R) -> Result<()> {
    let mut lines = input.lines();
    match lines.next_line().await.context("Failed to read operator input")? {
        Some(_) => Ok(()),
        None => anyhow::bail!("Operator input closed before sign-in was confirmed"),
    }
}

/// Pause for the operator if the current page asks for a sign-in.
///
/// Returns `true` when the run was paused.
///
/// # Errors
///
/// Returns an error if the page cannot be queried or operator input fails.
pub async fn ensure_signed_in<S, R>(session: &S, selector: &str, input: R) -> Result<bool>
where
    S: PageSession + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let indicators = sign_in_indicators(session, selector).await?;
    if indicators == 0 {
        return Ok(false);
    }

    warn!(
        selector = %selector,
        indicators,
        "Sign-in required; complete the login in the browser window, then press Enter to continue"
    );

    wait_for_operator(input).await?;
    info!("Operator confirmed sign-in, resuming");
    Ok(true)
}
