//! FFmpeg filter graphs and commands for each editing operation.

use std::path::Path;

use vedit_models::QualityPreset;

use crate::command::FfmpegCommand;

/// Width overlay and watermark assets are scaled to, keeping aspect ratio.
pub const OVERLAY_ASSET_WIDTH: u32 = 100;

/// Font size used for text overlays.
pub const TEXT_FONT_SIZE: u32 = 24;

/// Text color used for text overlays.
pub const TEXT_FONT_COLOR: &str = "white";

/// Watermark margin from the top-right corner, in pixels.
pub const WATERMARK_MARGIN: u32 = 10;

/// Position and visibility window of an overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub x: i64,
    pub y: i64,
    pub start_time: f64,
    pub end_time: f64,
}

impl OverlayPlacement {
    fn enable_expr(&self) -> String {
        format!("enable='between(t,{},{})'", self.start_time, self.end_time)
    }
}

/// Characters that need a backslash where a filter option value is
/// tokenized (`key=value:key=value`).
const OPTION_SPECIAL: &[char] = &['\\', '\'', ':', ' ', '\t', '\n', '\r'];

/// Characters that need a backslash where a filter graph is tokenized.
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';', ' ', '\t', '\n', '\r'];

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a literal option value so it survives both the filter graph
/// parser and the option parser.
pub fn escape_filter_value(value: &str) -> String {
    escape_chars(&escape_chars(value, OPTION_SPECIAL), GRAPH_SPECIAL)
}

/// Escape drawtext content. drawtext expands `%{...}` sequences and
/// unescapes `\x` itself, on top of the two parser levels.
pub fn escape_drawtext(text: &str) -> String {
    escape_filter_value(&escape_chars(text, &['\\', '%']))
}

/// `drawtext` filter for a timed text overlay.
pub fn text_overlay_filter(text: &str, font_file: &Path, placement: &OverlayPlacement) -> String {
    format!(
        "drawtext=text={}:x={}:y={}:fontsize={}:fontcolor={}:fontfile={}:{}",
        escape_drawtext(text),
        placement.x,
        placement.y,
        TEXT_FONT_SIZE,
        TEXT_FONT_COLOR,
        escape_filter_value(&font_file.to_string_lossy()),
        placement.enable_expr()
    )
}

/// Filter graph compositing input 1 (scaled) over input 0.
pub fn overlay_filter(placement: &OverlayPlacement) -> String {
    format!(
        "[1:v]scale={}:-1[ovrl]; [0:v][ovrl]overlay={}:{}:{}",
        OVERLAY_ASSET_WIDTH,
        placement.x,
        placement.y,
        placement.enable_expr()
    )
}

/// Filter graph pinning input 1 (scaled) to the top-right corner.
pub fn watermark_filter() -> String {
    format!(
        "[1:v]scale={}:-1[ovrl]; [0:v][ovrl]overlay=W-w-{m}:{m}",
        OVERLAY_ASSET_WIDTH,
        m = WATERMARK_MARGIN
    )
}

/// Scale filter keeping aspect ratio with an even width.
pub fn quality_filter(quality: QualityPreset) -> String {
    format!("scale=-2:{}", quality.height())
}

/// Stream-copy the `[start, end]` window of the input.
pub fn trim_command(input: &Path, output: &Path, start_time: f64, end_time: f64) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .output_args(["-ss".to_string(), start_time.to_string()])
        .output_args(["-to".to_string(), end_time.to_string()])
        .codec_copy()
}

pub fn text_overlay_command(
    input: &Path,
    output: &Path,
    text: &str,
    font_file: &Path,
    placement: &OverlayPlacement,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output).video_filter(text_overlay_filter(text, font_file, placement))
}

pub fn image_overlay_command(
    input: &Path,
    image: &Path,
    output: &Path,
    placement: &OverlayPlacement,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .extra_input(image)
        .filter_complex(overlay_filter(placement))
}

/// Same graph as the image overlay; the second input is a video.
pub fn video_overlay_command(
    input: &Path,
    overlay_video: &Path,
    output: &Path,
    placement: &OverlayPlacement,
) -> FfmpegCommand {
    image_overlay_command(input, overlay_video, output, placement)
}

pub fn watermark_command(input: &Path, image: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .extra_input(image)
        .filter_complex(watermark_filter())
}

pub fn quality_command(input: &Path, output: &Path, quality: QualityPreset) -> FfmpegCommand {
    FfmpegCommand::new(input, output).video_filter(quality_filter(quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn placement() -> OverlayPlacement {
        OverlayPlacement {
            x: 10,
            y: 20,
            start_time: 1.5,
            end_time: 4.0,
        }
    }

    /// Arguments after the global `-y -v error -progress pipe:2` prefix.
    fn tail(cmd: &FfmpegCommand) -> Vec<String> {
        cmd.build_args().into_iter().skip(5).collect()
    }

    #[test]
    fn test_trim_command() {
        let cmd = trim_command(Path::new("in.mp4"), Path::new("trimmed_in.mp4"), 2.0, 7.5);
        assert_eq!(
            tail(&cmd),
            vec!["-i", "in.mp4", "-ss", "2", "-to", "7.5", "-c", "copy", "trimmed_in.mp4"]
        );
    }

    /// Tokenizer used by ffmpeg at both the graph and the option level:
    /// backslash escapes one char, single quotes group, unescaped edge
    /// whitespace is dropped. Returns the token and the unparsed rest.
    fn get_token<'a>(input: &'a str, term: &[char]) -> (String, &'a str) {
        let is_ws = |c: char| matches!(c, ' ' | '\n' | '\t' | '\r');
        let mut chars = input.trim_start_matches(is_ws).char_indices().peekable();
        let rest_start = input.len() - input.trim_start_matches(is_ws).len();
        let mut out = String::new();
        let mut keep = 0;
        let mut consumed = input.len() - rest_start;
        while let Some((i, c)) = chars.next() {
            if term.contains(&c) {
                consumed = i;
                break;
            }
            match c {
                '\\' if chars.peek().is_some() => {
                    if let Some((_, next)) = chars.next() {
                        out.push(next);
                    }
                    keep = out.len();
                }
                '\'' => {
                    let mut closed = false;
                    for (_, q) in chars.by_ref() {
                        if q == '\'' {
                            closed = true;
                            break;
                        }
                        out.push(q);
                    }
                    if closed {
                        keep = out.len();
                    }
                }
                c => out.push(c),
            }
        }
        while out.len() > keep && out.ends_with(is_ws) {
            out.pop();
        }
        (out, &input[rest_start + consumed..])
    }

    /// Options of a single-filter graph, as the filter receives them.
    fn parse_single_filter(graph: &str) -> (String, Vec<(String, String)>) {
        let (name, args) = graph.split_once('=').unwrap();
        let (args, rest) = get_token(args, &['[', ']', ',', ';']);
        assert_eq!(rest, "", "graph split into more than one filter");

        let mut options = Vec::new();
        let mut remaining = args.as_str();
        while !remaining.is_empty() {
            let (key, value) = remaining.split_once('=').unwrap();
            let (value, rest) = get_token(value, &[':']);
            options.push((key.to_string(), value));
            remaining = rest.strip_prefix(':').unwrap_or(rest);
        }
        (name.to_string(), options)
    }

    /// drawtext's own unescaping; a bare `%` is rejected by ffmpeg.
    fn drawtext_render(text: &str) -> Result<String, String> {
        let mut out = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek().is_some() => out.extend(chars.next()),
                '%' => return Err(format!("Stray % in {text:?}")),
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn option<'a>(options: &'a [(String, String)], key: &str) -> &'a str {
        &options.iter().find(|(k, _)| k == key).unwrap().1
    }

    #[test]
    fn test_text_overlay_filter() {
        let filter = text_overlay_filter("Hello", Path::new("/fonts/NotoSans-Regular.ttf"), &placement());
        assert_eq!(
            filter,
            "drawtext=text=Hello:x=10:y=20:fontsize=24:fontcolor=white:\
             fontfile=/fonts/NotoSans-Regular.ttf:enable='between(t,1.5,4)'"
        );
    }

    #[test]
    fn test_drawtext_text_survives_parsing() {
        let samples = [
            "Hello: world",
            "it's",
            "100%",
            "a\\b",
            "it's 10:30, [live]; 50% off \\o/",
            "  padded  ",
            "%{localtime}",
        ];
        for text in samples {
            let filter = text_overlay_filter(text, Path::new("/fonts/My Font's.ttf"), &placement());
            let (name, options) = parse_single_filter(&filter);

            assert_eq!(name, "drawtext");
            assert_eq!(drawtext_render(option(&options, "text")).as_deref(), Ok(text));
            assert_eq!(option(&options, "fontfile"), "/fonts/My Font's.ttf");
            assert_eq!(option(&options, "x"), "10");
            assert_eq!(option(&options, "enable"), "between(t,1.5,4)");
        }
    }

    #[test]
    fn test_overlay_filter() {
        assert_eq!(
            overlay_filter(&placement()),
            "[1:v]scale=100:-1[ovrl]; [0:v][ovrl]overlay=10:20:enable='between(t,1.5,4)'"
        );
    }

    #[test]
    fn test_watermark_filter() {
        assert_eq!(
            watermark_filter(),
            "[1:v]scale=100:-1[ovrl]; [0:v][ovrl]overlay=W-w-10:10"
        );
    }

    #[test]
    fn test_image_overlay_command() {
        let cmd = image_overlay_command(
            Path::new("in.mp4"),
            Path::new("overlays/logo.png"),
            Path::new("out.mp4"),
            &placement(),
        );
        let args = tail(&cmd);
        assert_eq!(&args[..4], &["-i", "in.mp4", "-i", "overlays/logo.png"]);
        assert_eq!(args[4], "-filter_complex");
        assert_eq!(cmd.extra_inputs(), &[PathBuf::from("overlays/logo.png")]);
    }

    #[test]
    fn test_quality_command() {
        let cmd = quality_command(Path::new("in.mp4"), Path::new("720p_in.mp4"), QualityPreset::P720);
        assert_eq!(tail(&cmd), vec!["-i", "in.mp4", "-vf", "scale=-2:720", "720p_in.mp4"]);
        assert_eq!(quality_filter(QualityPreset::P1080), "scale=-2:1080");
        assert_eq!(quality_filter(QualityPreset::P480), "scale=-2:480");
    }
}
