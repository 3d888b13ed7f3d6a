//! JSON decoding over the line stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;

use super::{Invocation, LineStream};
use crate::{Error, Result};

impl Invocation {
    /// Spawn the subprocess and return a lazy stream of JSON values, one per
    /// non-blank stdout line.
    ///
    /// Blank and whitespace-only lines are skipped without producing a
    /// value. The first non-blank line that fails to decode yields
    /// [`Error::JsonDecode`] and ends the stream: the subprocess is killed
    /// and no further lines are consumed. Timeout and Execution errors from
    /// the underlying line stream pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] when the process cannot be spawned.
    pub async fn stream_json(&self) -> Result<JsonStream> {
        Ok(JsonStream {
            inner: Some(self.stream().await?),
        })
    }
}

/// A lazy stream of JSON values decoded from subprocess output lines.
///
/// Created by [`Invocation::stream_json`]. Dropping it kills the subprocess
/// like dropping the underlying [`LineStream`] does.
#[derive(Debug)]
pub struct JsonStream {
    inner: Option<LineStream>,
}

impl Stream for JsonStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let Some(inner) = self.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match Pin::new(inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.inner = None;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.inner = None;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(line))) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return match serde_json::from_str(&line) {
                        Ok(value) => Poll::Ready(Some(Ok(value))),
                        Err(err) => {
                            // Dropping the line stream kills the subprocess,
                            // so nothing past the bad line is consumed.
                            self.inner = None;
                            Poll::Ready(Some(Err(Error::json_decode(err, &line))))
                        }
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").args(["-c", script])
    }

    #[test]
    fn json_stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<JsonStream>();
    }

    #[tokio::test]
    async fn decodes_one_value_per_line() {
        let mut stream = sh(r#"printf '{"type":"start"}\n{"type":"end","n":2}\n'"#)
            .stream_json()
            .await
            .unwrap();

        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            json!({"type": "start"})
        );
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            json!({"type": "end", "n": 2})
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn blank_lines_produce_no_record() {
        let mut stream = sh(r#"printf '{"a":1}\n\n   \n{"b":2}\n'"#)
            .stream_json()
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"a": 1}));
        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"b": 2}));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn first_malformed_line_ends_the_stream() {
        let mut stream = sh(r#"printf '{"a":1}\n\nnot-json\n{"c":3}\n'"#)
            .stream_json()
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"a": 1}));

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::JsonDecode { .. }), "got {err:?}");

        // The {"c":3} line is never yielded
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn execution_errors_pass_through_unchanged() {
        let mut stream = sh(r#"printf '{"a":1}\n'; printf denied >&2; exit 7"#)
            .stream_json()
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"a": 1}));

        let err = stream.next().await.unwrap().unwrap_err();
        match err {
            Error::Execution {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(7));
                assert_eq!(stderr, "denied");
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_passes_through_unchanged() {
        use std::time::Duration;

        let mut stream = sh(r#"printf '{"a":1}\n'; exec sleep 10"#)
            .timeout(Duration::from_millis(300))
            .stream_json()
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), json!({"a": 1}));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_timeout(), "expected Timeout, got {err:?}");
    }
}
