use std::path::PathBuf;

use crate::foundation::{
    core::{Canvas, Fps, Rgba8},
    error::{SkitcastError, SkitcastResult},
};
use crate::script::model::{Directive, DirectiveKind, DurationSpec, Script};

/// Default fps for tag-syntax scripts whose `<end/>` omits the attribute.
pub const DEFAULT_FPS: u32 = 30;

/// Parse a script in either surface syntax.
///
/// The variant is detected from the first non-blank character: `[` selects
/// bracket commands, `<` selects block tags. Structural validation (single
/// terminal end, resolution before content, positive numerics) happens here,
/// not downstream.
pub fn parse_script(text: &str) -> SkitcastResult<Script> {
    let mut scan = Scanner::new(text);
    scan.skip_ws();
    let directives = match scan.peek() {
        Some('[') => parse_bracket(scan)?,
        Some('<') => parse_tags(scan)?,
        Some(_) => {
            return Err(SkitcastError::parse(
                scan.line,
                "script must start with a [COMMAND] or a <tag>",
            ));
        }
        None => return Err(SkitcastError::parse(1, "empty script")),
    };
    tracing::debug!(directives = directives.len(), "parsed script");
    Ok(Script { directives })
}

// ---------------------------------------------------------------------------
// shared scanning
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Consume up to and including `stop`, returning the interior slice.
    /// `None` when `stop` never occurs.
    fn take_until(&mut self, stop: char) -> Option<&'a str> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == stop {
                let inner = &self.src[start..self.pos];
                self.bump();
                return Some(inner);
            }
            self.bump();
        }
        None
    }

    /// Consume up to (not including) `stop` or end of input.
    fn take_to(&mut self, stop: char) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == stop {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

/// Collapse runs of whitespace so utterances are stable TTS keys.
fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Consume a bracket head up to `]`. Heads never span lines or nest, so a
/// newline, a second `[`, or end of input all mean the `]` was forgotten.
fn take_head<'a>(scan: &mut Scanner<'a>, line: u32) -> SkitcastResult<&'a str> {
    let start = scan.pos;
    loop {
        match scan.peek() {
            Some(']') => {
                let inner = &scan.src[start..scan.pos];
                scan.bump();
                return Ok(inner);
            }
            Some('\n') | Some('[') | None => {
                return Err(SkitcastError::parse(line, "missing closing ']'"));
            }
            Some(_) => {
                scan.bump();
            }
        }
    }
}

fn parse_secs(tok: &str, line: u32, what: &str) -> SkitcastResult<f64> {
    let v: f64 = tok
        .parse()
        .map_err(|_| SkitcastError::parse(line, format!("{what} '{tok}' is not a number")))?;
    if !v.is_finite() || v <= 0.0 {
        return Err(SkitcastError::parse(
            line,
            format!("{what} must be a positive number of seconds, got '{tok}'"),
        ));
    }
    Ok(v)
}

fn parse_duration_spec(tok: &str, line: u32) -> SkitcastResult<DurationSpec> {
    if tok.eq_ignore_ascii_case("auto") {
        return Ok(DurationSpec::Auto);
    }
    Ok(DurationSpec::Seconds(parse_secs(tok, line, "duration")?))
}

fn parse_u32(tok: &str, line: u32, what: &str) -> SkitcastResult<u32> {
    let v: u32 = tok.parse().map_err(|_| {
        SkitcastError::parse(line, format!("{what} '{tok}' is not a positive integer"))
    })?;
    if v == 0 {
        return Err(SkitcastError::parse(line, format!("{what} must be > 0")));
    }
    Ok(v)
}

fn parse_color(tok: &str, line: u32) -> SkitcastResult<Rgba8> {
    Rgba8::from_hex(tok).map_err(|_| {
        SkitcastError::parse(
            line,
            format!("invalid color '{tok}', expected #rrggbb or #rrggbbaa"),
        )
    })
}

/// Running structural state shared by both syntax variants.
#[derive(Default)]
struct Structure {
    resolution_seen: bool,
    content_seen: bool,
    end_line: Option<u32>,
}

impl Structure {
    fn check(&mut self, line: u32, kind: &DirectiveKind) -> SkitcastResult<()> {
        if let Some(end_line) = self.end_line {
            return Err(SkitcastError::parse(
                line,
                format!("'{}' after the end directive (line {end_line})", kind.name()),
            ));
        }
        match kind {
            DirectiveKind::SetResolution { canvas } => {
                if self.resolution_seen {
                    return Err(SkitcastError::parse(line, "duplicate resolution directive"));
                }
                if self.content_seen {
                    return Err(SkitcastError::parse(
                        line,
                        "resolution must be set before any content directive",
                    ));
                }
                if canvas.width == 0 || canvas.height == 0 {
                    return Err(SkitcastError::parse(line, "resolution must be > 0 pixels"));
                }
                self.resolution_seen = true;
            }
            DirectiveKind::End { .. } => self.end_line = Some(line),
            kind if kind.is_content() => self.content_seen = true,
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// bracket-command syntax
// ---------------------------------------------------------------------------

fn parse_bracket(mut scan: Scanner<'_>) -> SkitcastResult<Vec<Directive>> {
    let mut directives = Vec::new();
    let mut structure = Structure::default();
    let mut total_secs: Option<f64> = None;
    let mut end: Option<(u32, PathBuf, Fps)> = None;

    loop {
        scan.skip_ws();
        if scan.peek().is_none() {
            break;
        }
        let line = scan.line;
        if scan.peek() != Some('[') {
            return Err(SkitcastError::parse(
                line,
                "expected a [COMMAND], found stray text",
            ));
        }
        scan.bump();
        let head = take_head(&mut scan, line)?;

        let head = head.trim();
        let (word, rest) = match head.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (head, ""),
        };
        if word.is_empty() {
            return Err(SkitcastError::parse(line, "empty [] directive"));
        }

        // Utterance (speech commands) or stray text runs to the next '['.
        let tail = normalize_text(scan.take_to('['));

        let command = word.to_ascii_uppercase();
        if end.is_none() && total_secs.is_none() && command != "START" {
            return Err(SkitcastError::parse(
                line,
                "bracket scripts must open with [START <seconds>]",
            ));
        }

        let kind = match command.as_str() {
            "START" => {
                if total_secs.is_some() {
                    return Err(SkitcastError::parse(line, "duplicate [START]"));
                }
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [secs] = args[..] else {
                    return Err(SkitcastError::parse(line, "expected [START <seconds>]"));
                };
                total_secs = Some(parse_secs(secs, line, "total duration")?);
                reject_tail(&tail, line, "START")?;
                continue;
            }
            "RESOLUTION" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [w, h] = args[..] else {
                    return Err(SkitcastError::parse(
                        line,
                        "expected [RESOLUTION <width> <height>]",
                    ));
                };
                reject_tail(&tail, line, "RESOLUTION")?;
                DirectiveKind::SetResolution {
                    canvas: Canvas {
                        width: parse_u32(w, line, "width")?,
                        height: parse_u32(h, line, "height")?,
                    },
                }
            }
            "BACKGROUND" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let (color, duration) = match args[..] {
                    [color] => (parse_color(color, line)?, None),
                    [color, spec] => (
                        parse_color(color, line)?,
                        Some(parse_duration_spec(spec, line)?),
                    ),
                    _ => {
                        return Err(SkitcastError::parse(
                            line,
                            "expected [BACKGROUND <#rrggbb>] with an optional duration",
                        ));
                    }
                };
                reject_tail(&tail, line, "BACKGROUND")?;
                DirectiveKind::Background { color, duration }
            }
            "EMOTION" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [name, spec] = args[..] else {
                    return Err(SkitcastError::parse(
                        line,
                        "expected [EMOTION <name> <duration|auto>]",
                    ));
                };
                reject_tail(&tail, line, "EMOTION")?;
                DirectiveKind::EmotionDisplay {
                    emotion: name.to_string(),
                    duration: parse_duration_spec(spec, line)?,
                }
            }
            "ESPEECH" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [name, spec] = args[..] else {
                    return Err(SkitcastError::parse(
                        line,
                        "expected [ESPEECH <name> <duration|auto>] <text>",
                    ));
                };
                if tail.is_empty() {
                    return Err(SkitcastError::parse(
                        line,
                        "[ESPEECH] requires utterance text after the brackets",
                    ));
                }
                DirectiveKind::EmotionalSpeech {
                    emotion: name.to_string(),
                    duration: parse_duration_spec(spec, line)?,
                    text: tail,
                }
            }
            "TEXTSPEECH" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let [spec] = args[..] else {
                    return Err(SkitcastError::parse(
                        line,
                        "expected [TEXTSPEECH <duration|auto>] <text>",
                    ));
                };
                if tail.is_empty() {
                    return Err(SkitcastError::parse(
                        line,
                        "[TEXTSPEECH] requires utterance text after the brackets",
                    ));
                }
                DirectiveKind::TextSpeech {
                    duration: parse_duration_spec(spec, line)?,
                    text: tail,
                }
            }
            "INSERT" => {
                if rest.is_empty() {
                    return Err(SkitcastError::parse(line, "expected [INSERT <path>]"));
                }
                reject_tail(&tail, line, "INSERT")?;
                DirectiveKind::InsertVideo {
                    path: PathBuf::from(rest),
                }
            }
            "END" => {
                let Some((path_part, fps_part)) = rest.rsplit_once(char::is_whitespace) else {
                    return Err(SkitcastError::parse(
                        line,
                        "expected [END <output_path> <fps>]",
                    ));
                };
                reject_tail(&tail, line, "END")?;
                let fps = Fps(parse_u32(fps_part.trim(), line, "fps")?);
                end = Some((line, PathBuf::from(path_part.trim()), fps));
                structure.check(line, &placeholder_end())?;
                continue;
            }
            _ => {
                return Err(SkitcastError::parse(
                    line,
                    format!("unknown directive '[{word}]'"),
                ));
            }
        };

        structure.check(line, &kind)?;
        directives.push(Directive { line, kind });
    }

    let Some(total_secs) = total_secs else {
        return Err(SkitcastError::parse(
            scan.line,
            "bracket scripts must open with [START <seconds>]",
        ));
    };
    let Some((line, output, fps)) = end else {
        return Err(SkitcastError::parse(
            scan.line,
            "missing terminal [END <output_path> <fps>] directive",
        ));
    };
    directives.push(Directive {
        line,
        kind: DirectiveKind::End {
            output,
            fps,
            total_secs,
        },
    });
    Ok(directives)
}

fn reject_tail(tail: &str, line: u32, command: &str) -> SkitcastResult<()> {
    if tail.is_empty() {
        Ok(())
    } else {
        Err(SkitcastError::parse(
            line,
            format!("unexpected text after [{command}]"),
        ))
    }
}

/// Stand-in used to run the shared structural checks for `[END]` before the
/// full variant (which needs `[START]`'s total) can be constructed.
fn placeholder_end() -> DirectiveKind {
    DirectiveKind::End {
        output: PathBuf::new(),
        fps: Fps(1),
        total_secs: 1.0,
    }
}

// ---------------------------------------------------------------------------
// tag syntax
// ---------------------------------------------------------------------------

fn parse_tags(mut scan: Scanner<'_>) -> SkitcastResult<Vec<Directive>> {
    let mut directives = Vec::new();
    let mut structure = Structure::default();
    let mut end: Option<Directive> = None;

    loop {
        scan.skip_ws();
        if scan.peek().is_none() {
            break;
        }
        let line = scan.line;
        if scan.peek() != Some('<') {
            return Err(SkitcastError::parse(line, "expected a <tag>, found stray text"));
        }
        scan.bump();
        let body = scan
            .take_until('>')
            .ok_or_else(|| SkitcastError::parse(line, "unterminated tag, missing '>'"))?;
        if body.starts_with('/') {
            return Err(SkitcastError::parse(
                line,
                format!("closing tag '</{}>' without an open block", body[1..].trim()),
            ));
        }

        let (self_closing, body) = match body.strip_suffix('/') {
            Some(b) => (true, b),
            None => (false, body),
        };
        let body = body.trim();
        let (name, attr_src) = match body.split_once(char::is_whitespace) {
            Some((n, a)) => (n, a),
            None => (body, ""),
        };
        if name.is_empty() {
            return Err(SkitcastError::parse(line, "empty tag"));
        }
        let name_lc = name.to_ascii_lowercase();
        let mut attrs = parse_attrs(attr_src, line, &name_lc)?;

        let block_text = |scan: &mut Scanner<'_>, tag: &str| -> SkitcastResult<String> {
            let text = normalize_text(scan.take_to('<'));
            if scan.peek().is_none() {
                return Err(SkitcastError::parse(
                    line,
                    format!("unterminated <{tag}> block, missing </{tag}>"),
                ));
            }
            scan.bump();
            let close = scan
                .take_until('>')
                .ok_or_else(|| SkitcastError::parse(line, "unterminated tag, missing '>'"))?;
            let close = close.trim();
            let Some(close_name) = close.strip_prefix('/') else {
                return Err(SkitcastError::parse(
                    line,
                    format!("expected </{tag}> before any new tag"),
                ));
            };
            if !close_name.trim().eq_ignore_ascii_case(tag) {
                return Err(SkitcastError::parse(
                    line,
                    format!("mismatched closing tag </{}>, expected </{tag}>", close_name.trim()),
                ));
            }
            if text.is_empty() {
                return Err(SkitcastError::parse(
                    line,
                    format!("<{tag}> requires utterance text"),
                ));
            }
            Ok(text)
        };

        let require_self_closing = |self_closing: bool, tag: &str| -> SkitcastResult<()> {
            if self_closing {
                Ok(())
            } else {
                Err(SkitcastError::parse(
                    line,
                    format!("<{tag}> must be self-closing: <{tag} .../>"),
                ))
            }
        };

        let kind = match name_lc.as_str() {
            "resolution" => {
                require_self_closing(self_closing, "resolution")?;
                DirectiveKind::SetResolution {
                    canvas: Canvas {
                        width: parse_u32(&attrs.require("width")?, line, "width")?,
                        height: parse_u32(&attrs.require("height")?, line, "height")?,
                    },
                }
            }
            "background" => {
                require_self_closing(self_closing, "background")?;
                let color = parse_color(&attrs.require("color")?, line)?;
                let duration = match attrs.take("duration") {
                    Some(spec) => Some(parse_duration_spec(&spec, line)?),
                    None => None,
                };
                DirectiveKind::Background { color, duration }
            }
            "emotion" => {
                require_self_closing(self_closing, "emotion")?;
                DirectiveKind::EmotionDisplay {
                    emotion: attrs.require("name")?,
                    duration: parse_duration_spec(&attrs.require("duration")?, line)?,
                }
            }
            "espeech" => {
                if self_closing {
                    return Err(SkitcastError::parse(
                        line,
                        "<espeech> is a block tag: <espeech ...>text</espeech>",
                    ));
                }
                let emotion = attrs.require("emotion")?;
                let duration = parse_duration_spec(&attrs.require("duration")?, line)?;
                attrs.finish()?;
                let text = block_text(&mut scan, "espeech")?;
                let kind = DirectiveKind::EmotionalSpeech {
                    emotion,
                    duration,
                    text,
                };
                structure.check(line, &kind)?;
                directives.push(Directive { line, kind });
                continue;
            }
            "textspeech" => {
                if self_closing {
                    return Err(SkitcastError::parse(
                        line,
                        "<textspeech> is a block tag: <textspeech ...>text</textspeech>",
                    ));
                }
                let duration = parse_duration_spec(&attrs.require("duration")?, line)?;
                attrs.finish()?;
                let text = block_text(&mut scan, "textspeech")?;
                let kind = DirectiveKind::TextSpeech { duration, text };
                structure.check(line, &kind)?;
                directives.push(Directive { line, kind });
                continue;
            }
            "insert" => {
                require_self_closing(self_closing, "insert")?;
                DirectiveKind::InsertVideo {
                    path: PathBuf::from(attrs.require("src")?),
                }
            }
            "end" => {
                require_self_closing(self_closing, "end")?;
                if end.is_some() {
                    return Err(SkitcastError::parse(line, "duplicate <end/> directive"));
                }
                let output = PathBuf::from(attrs.require("output")?);
                let total_secs = parse_secs(&attrs.require("duration")?, line, "total duration")?;
                let fps = match attrs.take("fps") {
                    Some(v) => parse_u32(&v, line, "fps")?,
                    None => DEFAULT_FPS,
                };
                attrs.finish()?;
                let kind = DirectiveKind::End {
                    output,
                    fps: Fps(fps),
                    total_secs,
                };
                structure.check(line, &kind)?;
                end = Some(Directive { line, kind });
                continue;
            }
            _ => {
                return Err(SkitcastError::parse(
                    line,
                    format!("unknown tag '<{name}>'"),
                ));
            }
        };

        attrs.finish()?;
        structure.check(line, &kind)?;
        directives.push(Directive { line, kind });
    }

    let Some(end) = end else {
        return Err(SkitcastError::parse(
            scan.line,
            "missing terminal <end output=\"...\" duration=\"...\"/> directive",
        ));
    };
    directives.push(end);
    Ok(directives)
}

struct AttrMap {
    line: u32,
    tag: String,
    pairs: Vec<(String, String)>,
}

impl AttrMap {
    fn take(&mut self, key: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(idx).1)
    }

    fn require(&mut self, key: &str) -> SkitcastResult<String> {
        self.take(key).ok_or_else(|| {
            SkitcastError::parse(
                self.line,
                format!("<{}> is missing required attribute '{key}'", self.tag),
            )
        })
    }

    fn finish(&self) -> SkitcastResult<()> {
        match self.pairs.first() {
            Some((k, _)) => Err(SkitcastError::parse(
                self.line,
                format!("unknown attribute '{k}' on <{}>", self.tag),
            )),
            None => Ok(()),
        }
    }
}

fn parse_attrs(src: &str, line: u32, tag: &str) -> SkitcastResult<AttrMap> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut rest = src.trim();
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            return Err(SkitcastError::parse(
                line,
                format!("malformed attribute in <{tag}>, expected name=\"value\""),
            ));
        };
        let key = rest[..eq].trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SkitcastError::parse(
                line,
                format!("malformed attribute name '{key}' in <{tag}>"),
            ));
        }
        let after = rest[eq + 1..].trim_start();
        let Some(quoted) = after.strip_prefix('"') else {
            return Err(SkitcastError::parse(
                line,
                format!("attribute '{key}' in <{tag}> must be quoted"),
            ));
        };
        let Some(close) = quoted.find('"') else {
            return Err(SkitcastError::parse(
                line,
                format!("unterminated value for attribute '{key}' in <{tag}>"),
            ));
        };
        let value = &quoted[..close];
        if pairs.iter().any(|(k, _)| k == key) {
            return Err(SkitcastError::parse(
                line,
                format!("duplicate attribute '{key}' in <{tag}>"),
            ));
        }
        pairs.push((key.to_string(), value.to_string()));
        rest = quoted[close + 1..].trim_start();
    }
    Ok(AttrMap {
        line,
        tag: tag.to_string(),
        pairs,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/script/parse.rs"]
mod tests;
