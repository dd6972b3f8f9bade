//! Argument construction for yt-dlp downloads.

use super::config::FetcherConfig;
use super::types::FetchRequest;

/// Builds the yt-dlp argument list for a download.
pub fn build_download_args(request: &FetchRequest, config: &FetcherConfig) -> Vec<String> {
    let playlist = is_playlist_url(&request.url);

    let mut args = vec![
        // One progress line per update instead of carriage-return redraws.
        "--newline".to_string(),
        "--no-colors".to_string(),
        // Artifact age is measured from mtime; keep it at download time.
        "--no-mtime".to_string(),
        if playlist {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        },
    ];

    if request.format.is_audio() {
        args.extend([
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            config.audio_format.clone(),
        ]);
    } else {
        let mut max_height = request.quality.max_height();
        if is_short_form(&request.url) {
            let cap = config.short_form_max_height;
            max_height = Some(max_height.map_or(cap, |h| h.min(cap)));
        }
        args.extend([
            "-f".to_string(),
            video_format_selector(max_height),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ]);
    }

    let template = if playlist {
        "%(playlist_index)s - %(title)s.%(ext)s"
    } else {
        "%(title)s.%(ext)s"
    };
    args.extend([
        "-o".to_string(),
        request.output_dir.join(template).to_string_lossy().to_string(),
    ]);

    if let Some(ref cookie_file) = request.cookie_file {
        args.extend([
            "--cookies".to_string(),
            cookie_file.to_string_lossy().to_string(),
        ]);
    }

    args.extend(config.extra_args.iter().cloned());

    args.push("--".to_string());
    args.push(request.url.clone());

    args
}

/// Format selector preferring separate MP4 video + M4A audio streams,
/// optionally capped at `max_height`.
pub fn video_format_selector(max_height: Option<u32>) -> String {
    match max_height {
        Some(h) => format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]"
        ),
        None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
    }
}

/// Short-form vertical clips (YouTube Shorts).
pub fn is_short_form(url: &str) -> bool {
    url.contains("/shorts/")
}

/// Whether the URL names a playlist rather than a single item.
///
/// A watch URL that carries a `list=` parameter is treated as the single
/// item being watched.
pub fn is_playlist_url(url: &str) -> bool {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    if path.ends_with("/playlist") {
        return true;
    }

    let mut has_list = false;
    let mut has_item = false;
    for pair in query.split('&') {
        match pair.split_once('=').map(|(k, _)| k).unwrap_or(pair) {
            "list" => has_list = true,
            "v" => has_item = true,
            _ => {}
        }
    }
    has_list && !has_item
}
