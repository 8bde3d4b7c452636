use futures::stream::{Stream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};

use super::OllamaClient;
use crate::{Error, Result};

/// POST a JSON body and stream the response as newline-delimited records.
///
/// Ollama's `/api/generate` and `/api/chat` return a chunked body where
/// each line is a complete JSON object; the final line carries `done:
/// true`. This stitches partial chunks back into lines the way a raw TCP
/// read would arrive split across buffer boundaries.
pub(super) async fn post_jsonl<B: Serialize + ?Sized>(
    client: &OllamaClient,
    path: &str,
    body: &B,
) -> Result<impl Stream<Item = Result<String>>> {
    let response = client
        .request(reqwest::Method::POST, path)
        .json(body)
        .send()
        .await?;
    let response = response.error_for_status()?;

    let mut byte_stream = response.bytes_stream();
    let mut buf = String::new();

    Ok(async_stream::stream! {
        loop {
            match byte_stream.next().await {
                Some(Ok(bytes)) => {
                    buf.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(idx) = buf.find('\n') {
                        let line = buf[..idx].trim().to_string();
                        buf.drain(..=idx);
                        if !line.is_empty() {
                            yield Ok(line);
                        }
                    }
                }
                Some(Err(err)) => {
                    yield Err(Error::from(err));
                    return;
                }
                None => {
                    let tail = buf.trim().to_string();
                    if !tail.is_empty() {
                        yield Ok(tail);
                    }
                    return;
                }
            }
        }
    })
}

/// POST a JSON body and deserialize the (non-streamed) JSON response.
pub(super) async fn post_json<B, T>(client: &OllamaClient, path: &str, body: &B) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .request(reqwest::Method::POST, path)
        .json(body)
        .send()
        .await?
        .error_for_status()?;
    let value = response.json::<T>().await?;
    Ok(value)
}

/// GET and deserialize a JSON response, used for discovery endpoints.
pub(super) async fn get_json<T: DeserializeOwned>(client: &OllamaClient, path: &str) -> Result<T> {
    let response = client
        .request(reqwest::Method::GET, path)
        .send()
        .await?
        .error_for_status()?;
    let value = response.json::<T>().await?;
    Ok(value)
}
