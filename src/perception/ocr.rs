//! Text extraction through the `tesseract` command-line engine.

use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::OcrConfig;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::perception::traits::TextExtractor;
use crate::perception::types::{ExtractMode, RecognizedToken, Region, ScreenImage};

impl ExtractMode {
    /// Tesseract page segmentation mode.
    pub fn psm(self) -> u8 {
        match self {
            ExtractMode::Block => 6,
            ExtractMode::SingleWord => 8,
            ExtractMode::SingleLine => 7,
            ExtractMode::Sparse => 11,
            ExtractMode::RawLine => 13,
        }
    }
}

pub struct TesseractExtractor {
    config: OcrConfig,
}

impl TesseractExtractor {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn upscale(&self) -> u32 {
        self.config.upscale.max(1)
    }

    /// Grayscale, 3x3 median, upscale, PNG.
    fn preprocess(&self, image: &ScreenImage) -> AutoQuizResult<Vec<u8>> {
        let gray: GrayImage = image::imageops::grayscale(image.pixels());
        let denoised = imageproc::filter::median_filter(&gray, 1, 1);
        let factor = self.upscale();
        let scaled = if factor > 1 {
            image::imageops::resize(
                &denoised,
                denoised.width() * factor,
                denoised.height() * factor,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            denoised
        };
        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(scaled).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    async fn run(&self, png: Vec<u8>, mode: ExtractMode, tsv: bool) -> AutoQuizResult<String> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(mode.psm().to_string());
        if tsv {
            cmd.arg("tsv");
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            AutoQuizError::ExtractionFailed(format!("cannot start {}: {e}", self.config.binary))
        })?;
        // Feeding stdin counts against the timeout. Dropping the child kills it.
        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&png).await?;
            }
            Ok::<_, std::io::Error>(child.wait_with_output().await?)
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| AutoQuizError::ExtractionFailed(format!("ocr timed out after {timeout:?}")))??;
        if !output.status.success() {
            return Err(AutoQuizError::ExtractionFailed(format!(
                "{} exited with {}: {}",
                self.config.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn try_text(&self, image: &ScreenImage, mode: ExtractMode) -> AutoQuizResult<String> {
        let png = self.preprocess(image)?;
        let raw = self.run(png, mode, false).await?;
        Ok(clean_text(&raw))
    }

    async fn try_tokens(&self, image: &ScreenImage) -> AutoQuizResult<Vec<RecognizedToken>> {
        let png = self.preprocess(image)?;
        let tsv = self.run(png, ExtractMode::Sparse, true).await?;
        let origin = image.origin();
        let factor = self.upscale() as i32;
        Ok(parse_tsv(&tsv, self.config.min_confidence)
            .into_iter()
            .map(|mut t| {
                t.bbox = Region::new(
                    origin.x + t.bbox.x / factor,
                    origin.y + t.bbox.y / factor,
                    t.bbox.width / factor as u32,
                    t.bbox.height / factor as u32,
                );
                t
            })
            .collect())
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, image: &ScreenImage, mode: ExtractMode) -> String {
        match self.try_text(image, mode).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, mode = ?mode, "text extraction failed, using empty text");
                String::new()
            }
        }
    }

    async fn extract_tokens(&self, image: &ScreenImage) -> Vec<RecognizedToken> {
        match self.try_tokens(image).await {
            Ok(tokens) => {
                tracing::debug!(count = tokens.len(), "tokens extracted");
                tokens
            }
            Err(e) => {
                tracing::warn!(error = %e, "token extraction failed, no tokens");
                Vec::new()
            }
        }
    }
}

/// Words above `min_confidence`, boxes still in the OCR image's pixel space.
pub fn parse_tsv(tsv: &str, min_confidence: u8) -> Vec<RecognizedToken> {
    let mut lines = tsv.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let cols: Vec<&str> = header.split('\t').collect();
    let idx = |name: &str| cols.iter().position(|c| *c == name);
    let (Some(left), Some(top), Some(width), Some(height), Some(conf), Some(text)) = (
        idx("left"),
        idx("top"),
        idx("width"),
        idx("height"),
        idx("conf"),
        idx("text"),
    ) else {
        return Vec::new();
    };

    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let word = fields.get(text)?.trim();
            if word.is_empty() {
                return None;
            }
            let confidence: f64 = fields.get(conf)?.trim().parse().ok()?;
            if confidence <= min_confidence as f64 {
                return None;
            }
            let num = |i: usize| fields.get(i).and_then(|v| v.trim().parse::<i32>().ok());
            Some(RecognizedToken::new(
                word,
                confidence.round().clamp(0.0, 100.0) as u8,
                Region::new(
                    num(left)?,
                    num(top)?,
                    num(width)?.max(0) as u32,
                    num(height)?.max(0) as u32,
                ),
            ))
        })
        .collect()
}

/// Collapse whitespace and repair digit/letter confusions inside words.
pub fn clean_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    [('|', 'l'), ('0', 'O'), ('5', 'S'), ('1', 'l')]
        .into_iter()
        .fold(collapsed, |text, (from, to)| replace_between_letters(&text, from, to))
}

fn replace_between_letters(text: &str, from: char, to: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            let inside_word = prev.is_some_and(|p| p.is_ascii_alphabetic())
                && next.is_some_and(|n| n.is_ascii_alphabetic());
            if c == from && inside_word {
                to
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_fixes_letters_only_inside_words() {
        assert_eq!(clean_text("  he|lo   w0rld\n"), "hello wOrld");
        assert_eq!(clean_text("5tar ba5e 10 a1b"), "5tar baSe 10 alb");
        // Neighbours are judged on the text before the pass.
        assert_eq!(clean_text("a11b"), "a11b");
    }

    #[test]
    fn tsv_keeps_confident_words() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t20\t40\t60\t20\t96.5\tthe\n\
                   5\t1\t1\t1\t1\t2\t90\t40\t80\t20\t12.0\tqu1ck\n\
                   5\t1\t1\t1\t1\t3\t180\t40\t70\t20\t88\tbrown\n";
        let tokens = parse_tsv(tsv, 30);
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, ["the", "brown"]);
        assert_eq!(tokens[0].confidence, 97);
        assert_eq!(tokens[1].bbox, Region::new(180, 40, 70, 20));
    }

    #[test]
    fn modes_map_to_page_segmentation() {
        assert_eq!(ExtractMode::Block.psm(), 6);
        assert_eq!(ExtractMode::SingleWord.psm(), 8);
        assert_eq!(ExtractMode::Sparse.psm(), 11);
    }

    #[tokio::test]
    async fn missing_engine_degrades_to_empty_text() {
        let extractor = TesseractExtractor::new(OcrConfig {
            binary: "autoquiz-no-such-ocr-binary".into(),
            ..OcrConfig::default()
        });
        let img = ScreenImage::blank(40, 20, [255, 255, 255]);
        assert_eq!(extractor.extract_text(&img, ExtractMode::Block).await, "");
        assert!(extractor.extract_tokens(&img).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_that_never_reads_input_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stuck-ocr");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let extractor = TesseractExtractor::new(OcrConfig {
            binary: script.to_string_lossy().into_owned(),
            timeout_secs: 1,
            ..OcrConfig::default()
        });
        // Far larger than a pipe buffer, so the write itself blocks.
        let input = vec![0u8; 4 << 20];
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            extractor.run(input, ExtractMode::Block, false),
        )
        .await
        .expect("ocr call must give up on its own");
        match result {
            Err(AutoQuizError::ExtractionFailed(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
