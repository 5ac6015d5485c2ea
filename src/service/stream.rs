//! Split-stream primitive: produce two independent readers of one origin
//! bytestream, both observing the same bytes in the same order.
//!
//! Adapted from the fan-out idiom used for coalesced stream followers
//! elsewhere in this codebase, narrowed from a broadcast channel (N
//! followers) to a fixed pair of `mpsc` channels, since the read path only
//! ever has exactly two consumers: the client and one cache tier.

use std::fmt;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 8;

/// A frame forwarded to one side of a tee'd stream.
#[derive(Debug, Clone)]
pub enum ChunkMessage {
    Chunk(Bytes),
    Error(String),
}

/// Split `source` into two streams. A background task pumps frames from
/// `source` into both output channels until the source completes or
/// errors; a read error is forwarded to both sides and ends the pump. A
/// consumer that stops polling its side simply lets its channel fill and
/// then lags the pump via normal channel backpressure — it does not affect
/// the other side. Used where the two sides are genuinely independent
/// (e.g. the slow tier's own write doesn't need to stop just because the
/// client did).
pub fn tee<S, E>(mut source: S) -> (impl Stream<Item = Result<Bytes, String>>, impl Stream<Item = Result<Bytes, String>>)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: fmt::Display,
{
    let (tx_a, rx_a) = mpsc::channel(CHANNEL_CAPACITY);
    let (tx_b, rx_b) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(bytes) => {
                    let a = tx_a.send(ChunkMessage::Chunk(bytes.clone()));
                    let b = tx_b.send(ChunkMessage::Chunk(bytes));
                    let (a, b) = futures::join!(a, b);
                    if a.is_err() && b.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let msg = err.to_string();
                    let _ = tx_a.send(ChunkMessage::Error(msg.clone())).await;
                    let _ = tx_b.send(ChunkMessage::Error(msg)).await;
                    return;
                }
            }
        }
    });

    (receiver_stream(rx_a), receiver_stream(rx_b))
}

/// Like [`tee`], but the pump stops as soon as *either* side's receiver is
/// dropped, instead of waiting for both. Used by the fast tier, where a
/// client disconnect (the client-side receiver dropping) must also cut off
/// the accumulate side so it doesn't keep draining the origin body and
/// caching a response nobody is waiting on anymore.
pub fn tee_fused<S, E>(mut source: S) -> (impl Stream<Item = Result<Bytes, String>>, impl Stream<Item = Result<Bytes, String>>)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: fmt::Display,
{
    let (tx_a, rx_a) = mpsc::channel(CHANNEL_CAPACITY);
    let (tx_b, rx_b) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(bytes) => {
                    let a = tx_a.send(ChunkMessage::Chunk(bytes.clone()));
                    let b = tx_b.send(ChunkMessage::Chunk(bytes));
                    let (a, b) = futures::join!(a, b);
                    if a.is_err() || b.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let msg = err.to_string();
                    let _ = tx_a.send(ChunkMessage::Error(msg.clone())).await;
                    let _ = tx_b.send(ChunkMessage::Error(msg)).await;
                    return;
                }
            }
        }
    });

    (receiver_stream(rx_a), receiver_stream(rx_b))
}

fn receiver_stream(mut rx: mpsc::Receiver<ChunkMessage>) -> impl Stream<Item = Result<Bytes, String>> {
    stream::poll_fn(move |cx| rx.poll_recv(cx)).map(|msg| match msg {
        ChunkMessage::Chunk(bytes) => Ok(bytes),
        ChunkMessage::Error(msg) => Err(msg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::iter;

    #[tokio::test]
    async fn both_sides_observe_the_same_frames_in_order() {
        let source = iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
            Ok(Bytes::from_static(b"c")),
        ]);
        let (a, b) = tee(source);

        let collected_a: Vec<_> = a.collect().await;
        let collected_b: Vec<_> = b.collect().await;

        let flatten = |v: Vec<Result<Bytes, String>>| {
            v.into_iter().map(Result::unwrap).flat_map(|b| b.to_vec()).collect::<Vec<u8>>()
        };
        assert_eq!(flatten(collected_a), b"abc");
        assert_eq!(flatten(collected_b), b"abc");
    }

    #[tokio::test]
    async fn a_read_error_is_forwarded_to_both_sides() {
        let source = iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom")),
        ]);
        let (a, b) = tee(source);

        let results_a: Vec<_> = a.collect().await;
        let results_b: Vec<_> = b.collect().await;

        assert!(results_a.last().unwrap().is_err());
        assert!(results_b.last().unwrap().is_err());
    }

    #[tokio::test]
    async fn one_side_dropping_early_does_not_stall_the_other() {
        let source = iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]);
        let (a, b) = tee(source);
        drop(a);

        let collected_b: Vec<_> = b.collect().await;
        assert_eq!(collected_b.len(), 2);
    }

    #[tokio::test]
    async fn either_side_dropping_cancels_the_other() {
        let source = iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
            Ok(Bytes::from_static(b"c")),
        ]);
        let (a, b) = tee_fused(source);
        drop(a);

        // Dropping one side should stop the pump from delivering the rest
        // of the stream to the other side, unlike `tee`'s both-or-neither
        // behavior.
        let collected_b: Vec<_> = b.collect().await;
        assert!(collected_b.len() < 3);
    }
}
