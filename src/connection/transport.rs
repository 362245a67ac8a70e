use super::RequestError;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

/// Chunks of one long-poll request, in arrival order.
///
/// The stream ends when the server completes the response; an `Err` item
/// ends the request.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, RequestError>>;

/// Opens status requests for the live client
pub trait Transport: Send + 'static {
    /// Issue a new request. Nothing is sent until the stream is first polled;
    /// dropping the stream aborts the request.
    fn open(&self) -> ChunkStream;
}

/// Long-poll GET over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn open(&self) -> ChunkStream {
        let request = self.client.get(&self.url);
        let url = self.url.clone();

        let response = async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(RequestError::Status(status.as_u16()));
            }
            debug!(url = %url, "Status request accepted");
            Ok(body_chunks(response))
        };

        stream::once(response).try_flatten().boxed()
    }
}

/// Body of an accepted response; ends after the first read error
fn body_chunks(
    response: reqwest::Response,
) -> impl futures::Stream<Item = Result<Vec<u8>, RequestError>> + Send {
    stream::unfold(Some(response), |response| async move {
        let mut response = response?;
        match response.chunk().await {
            Ok(Some(bytes)) => Some((Ok(bytes.to_vec()), Some(response))),
            Ok(None) => None,
            Err(e) => Some((Err(RequestError::from(e)), None)),
        }
    })
}
