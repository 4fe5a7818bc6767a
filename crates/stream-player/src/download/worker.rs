//! Download worker thread.
//!
//! Serves [`DownloadRequest`]s one at a time; live pulls run on their own thread
//! so a continuous stream never blocks range requests.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use stream_player_proto::{DownloadRequest, DownloadResponse, DownloadToken, Protocol, StreamAbort};

use crate::download::http::HttpFetcher;
use crate::download::live::LiveChunks;
use crate::download::socket::SocketFetcher;
use crate::download::{AliveGuard, DownloadLink};

struct Transports {
    http: HttpFetcher,
    socket: SocketFetcher,
}

/// Spawn the download worker; returns the request link and the response stream.
pub fn spawn_download_worker(timeout: Duration) -> (DownloadLink, Receiver<DownloadResponse>) {
    let (req_tx, req_rx) = crossbeam_channel::unbounded();
    let (resp_tx, resp_rx) = crossbeam_channel::unbounded();
    let alive = Arc::new(AtomicBool::new(true));
    let guard = AliveGuard(alive.clone());

    let transports = Transports {
        http: HttpFetcher::new(timeout),
        socket: SocketFetcher::new(timeout),
    };
    let spawned = std::thread::Builder::new()
        .name("stream-download".to_string())
        .spawn(move || {
            let _guard = guard;
            worker_main(req_rx, resp_tx, transports);
        });
    if let Err(e) = spawned {
        tracing::error!("download worker spawn failed: {e}");
    }

    (DownloadLink::new(req_tx, alive), resp_rx)
}

fn worker_main(rx: Receiver<DownloadRequest>, tx: Sender<DownloadResponse>, transports: Transports) {
    let mut streams: Vec<StreamAbort> = Vec::new();

    while let Ok(req) = rx.recv() {
        let resp = match req {
            DownloadRequest::GetInfo { url, protocol } => Some(get_info(&transports, &url, protocol)),
            DownloadRequest::Download {
                url,
                protocol,
                start,
                end,
                token,
            } => Some(download(&transports, &url, protocol, start, end, token)),
            DownloadRequest::OpenStream {
                url,
                chunk_size,
                token,
                abort,
            } => {
                streams.retain(|s| !s.is_aborted());
                streams.push(abort.clone());
                spawn_live_pull(transports.http.clone(), url, chunk_size, token, abort, tx.clone());
                None
            }
            DownloadRequest::Close => break,
        };
        if let Some(resp) = resp {
            if tx.send(resp).is_err() {
                break;
            }
        }
    }

    for abort in streams {
        abort.abort();
    }
    tracing::debug!("download worker exiting");
}

fn get_info(t: &Transports, url: &str, protocol: Protocol) -> DownloadResponse {
    let probe = match protocol {
        Protocol::Http => t.http.probe_size(url).map(|p| {
            let size = p.size.and_then(|s| i64::try_from(s).ok()).unwrap_or(-1);
            (size, p.http_status)
        }),
        Protocol::Socket => t.socket.probe_size(url).map(|size| (size, 200)),
    };
    match probe {
        Ok((size, http_status)) => DownloadResponse::InfoResp { size, http_status },
        Err(e) => {
            tracing::warn!(url, "file info request failed: {e}");
            DownloadResponse::Failed {
                token: None,
                error: e.to_string(),
            }
        }
    }
}

fn download(
    t: &Transports,
    url: &str,
    protocol: Protocol,
    start: u64,
    end: u64,
    token: DownloadToken,
) -> DownloadResponse {
    let fetched = match protocol {
        Protocol::Http => t.http.fetch_range(url, start, end),
        Protocol::Socket => t.socket.fetch_range(url, start, end),
    };
    match fetched {
        Ok(bytes) => DownloadResponse::DataResp {
            start,
            end,
            token,
            bytes,
        },
        Err(e) => {
            tracing::warn!(start, end, "chunk download failed: {e}");
            DownloadResponse::Failed {
                token: Some(token),
                error: e.to_string(),
            }
        }
    }
}

fn spawn_live_pull(
    http: HttpFetcher,
    url: String,
    chunk_size: usize,
    token: DownloadToken,
    abort: StreamAbort,
    tx: Sender<DownloadResponse>,
) {
    let spawned = std::thread::Builder::new()
        .name("stream-live".to_string())
        .spawn(move || {
            let error = live_pull(&http, &url, chunk_size, token, &abort, &tx);
            if !abort.is_aborted() {
                let _ = tx.send(DownloadResponse::StreamEnded { token, error });
            }
            tracing::info!(url = %url, "live stream done");
        });
    if let Err(e) = spawned {
        tracing::error!("live pull spawn failed: {e}");
    }
}

fn live_pull(
    http: &HttpFetcher,
    url: &str,
    chunk_size: usize,
    token: DownloadToken,
    abort: &StreamAbort,
    tx: &Sender<DownloadResponse>,
) -> Option<String> {
    if Protocol::from_url(url) != Some(Protocol::Http) {
        return Some("live sources are pulled over http".to_string());
    }
    let reader = match http.open_stream(url) {
        Ok(r) => r,
        Err(e) => return Some(e.to_string()),
    };
    for chunk in LiveChunks::new(reader, chunk_size, abort.clone()) {
        match chunk {
            Ok(bytes) => {
                if tx.send(DownloadResponse::StreamData { token, bytes }).is_err() {
                    return None;
                }
            }
            Err(e) => return Some(e.to_string()),
        }
    }
    None
}
