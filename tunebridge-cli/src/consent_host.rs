//! Terminal host for the Spotify consent step.
//!
//! Prints the authorization URL, tries to open it in a browser and reads the
//! redirect URL the user pastes back.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use provider_spotify::consent::ConsentRequest;

/// Launches a URL in the user's browser. Runs on the blocking pool.
pub type BrowserOpener = fn(&str) -> std::io::Result<()>;

/// Answer consent requests from the terminal until the flow is dropped.
pub fn spawn_terminal_host(requests: mpsc::Receiver<ConsentRequest>) -> JoinHandle<()> {
    spawn_host(requests, BufReader::new(tokio::io::stdin()), webbrowser::open)
}

/// Answer consent requests with callback URLs read line by line from `input`.
pub fn spawn_host<R>(
    mut requests: mpsc::Receiver<ConsentRequest>,
    input: R,
    open_browser: BrowserOpener,
) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = input.lines();
        let mut stderr = tokio::io::stderr();

        while let Some(request) = requests.recv().await {
            let prompt = format!(
                "\nOpen this URL to authorize Tunebridge:\n\n  {}\n\nAfter approving, paste the URL you were redirected to and press Enter:\n> ",
                request.authorize_url
            );
            if stderr.write_all(prompt.as_bytes()).await.is_err() {
                request.fail("Could not write to the terminal");
                continue;
            }
            let _ = stderr.flush().await;

            let authorize_url = request.authorize_url.to_string();
            match tokio::task::spawn_blocking(move || open_browser(&authorize_url)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Could not open a browser: {}", e),
                Err(e) => warn!("Browser launch task failed: {}", e),
            }

            match lines.next_line().await {
                Ok(Some(line)) => match parse_callback(&line, &request.redirect_uri) {
                    Ok(Some(callback)) => {
                        debug!("Received callback URL");
                        request.complete(callback);
                    }
                    Ok(None) => request.cancel(),
                    Err(reason) => request.fail(reason),
                },
                Ok(None) => request.cancel(),
                Err(e) => request.fail(format!("Failed to read from stdin: {e}")),
            }
        }
    })
}

/// Interpret a pasted line.
///
/// An empty line cancels. Anything else must be a URL under `redirect_uri`.
pub fn parse_callback(input: &str, redirect_uri: &str) -> Result<Option<Url>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let callback = Url::parse(input).map_err(|e| format!("Not a valid URL: {e}"))?;
    if !callback.as_str().starts_with(redirect_uri) {
        return Err(format!("Expected a URL starting with {redirect_uri}"));
    }

    Ok(Some(callback))
}
