// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a streamed response body into agent chunks.
//!
//! Record framing (blank-line separation, `data:` fields) is handled by
//! `eventsource-stream`; each record payload then goes through the chunk
//! parser. The stream ends at the `[DONE]` sentinel or when the body ends.

use chatline_core::{ChatError, ChunkStream};
use chatline_stream::{Record, parse_record};
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::StreamExt;

/// Parses a successful streaming response into a [`ChunkStream`].
pub fn parse_chunk_stream(response: reqwest::Response) -> ChunkStream {
    let records = response
        .bytes_stream()
        .eventsource()
        .map(|result| match result {
            Ok(event) => Ok(parse_record(&event.data)),
            Err(e) => Err(ChatError::transport(format!("stream read failed: {e}"))),
        });

    let chunks = records
        .take_while(|record| future::ready(!matches!(record, Ok(Record::EndOfStream))))
        .filter_map(|record| {
            future::ready(match record {
                Ok(Record::Chunk(chunk)) => Some(Ok(chunk)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });

    Box::pin(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::{ChunkKind, StreamChunk};

    async fn mock_stream_response(body: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    async fn collect(body: &str) -> Vec<StreamChunk> {
        let response = mock_stream_response(body).await;
        parse_chunk_stream(response)
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn records_become_chunks() {
        let body = "data: {\"type\":\"content\",\"content\":\"Hel\"}\n\n\
                    data: {\"type\":\"content\",\"chunk\":\"lo\"}\n\n\
                    data: {\"type\":\"done\"}\n\n";
        let chunks = collect(body).await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta(), Some("Hel"));
        assert_eq!(chunks[1].delta(), Some("lo"));
        assert_eq!(chunks[2].kind, ChunkKind::Done);
    }

    #[tokio::test]
    async fn sentinel_stops_reading() {
        let body = "data: {\"type\":\"content\",\"content\":\"a\"}\n\n\
                    data: [DONE]\n\n\
                    data: {\"type\":\"content\",\"content\":\"b\"}\n\n";
        let chunks = collect(body).await;
        assert_eq!(chunks, vec![StreamChunk::content("a")]);
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let body = "data: {\"type\":\"content\",\"content\":\n\n\
                    : keep-alive\n\n\
                    data: {\"type\":\"content\",\"content\":\"ok\"}\n\n";
        let chunks = collect(body).await;
        assert_eq!(chunks, vec![StreamChunk::content("ok")]);
    }
}
