use super::*;

fn parse_err(text: &str) -> (u32, String) {
    match parse_script(text) {
        Err(SkitcastError::Parse { line, msg }) => (line, msg),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn bracket_single_line_script_parses() {
    let script =
        parse_script("[START 12][EMOTION happy 1.0][ESPEECH happy auto] Hi.[END out.mp4 30]")
            .unwrap();

    assert_eq!(script.directives.len(), 3);
    assert_eq!(
        script.directives[0].kind,
        DirectiveKind::EmotionDisplay {
            emotion: "happy".to_string(),
            duration: DurationSpec::Seconds(1.0),
        }
    );
    assert_eq!(
        script.directives[1].kind,
        DirectiveKind::EmotionalSpeech {
            emotion: "happy".to_string(),
            duration: DurationSpec::Auto,
            text: "Hi.".to_string(),
        }
    );

    let framing = script.framing().unwrap();
    assert_eq!(framing.output, std::path::Path::new("out.mp4"));
    assert_eq!(framing.fps, Fps(30));
    assert_eq!(framing.total_secs, 12.0);
}

#[test]
fn bracket_multi_line_script_parses() {
    let text = "\
[START 20]
[RESOLUTION 1280 720]
[BACKGROUND #202020]

[emotion worried 2.5]
[TEXTSPEECH auto] A caption
spanning   two lines.
[INSERT clips/intro clip.mp4]
[END render/out.mp4 24]
";
    let script = parse_script(text).unwrap();
    let kinds: Vec<&DirectiveKind> = script.directives.iter().map(|d| &d.kind).collect();

    assert_eq!(
        kinds[0],
        &DirectiveKind::SetResolution {
            canvas: Canvas {
                width: 1280,
                height: 720
            }
        }
    );
    assert_eq!(
        kinds[1],
        &DirectiveKind::Background {
            color: Rgba8::from_hex("#202020").unwrap(),
            duration: None,
        }
    );
    // Command words are case-insensitive.
    assert!(matches!(kinds[2], DirectiveKind::EmotionDisplay { .. }));
    // Utterances run to the next '[' and collapse interior whitespace.
    assert_eq!(
        kinds[3],
        &DirectiveKind::TextSpeech {
            duration: DurationSpec::Auto,
            text: "A caption spanning two lines.".to_string(),
        }
    );
    // Insert paths may contain spaces.
    assert_eq!(
        kinds[4],
        &DirectiveKind::InsertVideo {
            path: std::path::PathBuf::from("clips/intro clip.mp4"),
        }
    );
    assert!(matches!(kinds[5], DirectiveKind::End { .. }));

    // Line numbers survive blank lines and multi-line utterances.
    assert_eq!(script.directives[2].line, 5);
    assert_eq!(script.directives[4].line, 8);
}

#[test]
fn bracket_background_accepts_duration_spec() {
    let script = parse_script("[START 5][BACKGROUND #ffffff auto][EMOTION joy 1][END o.mp4 30]")
        .unwrap();
    assert_eq!(
        script.directives[0].kind,
        DirectiveKind::Background {
            color: Rgba8::WHITE,
            duration: Some(DurationSpec::Auto),
        }
    );
}

#[test]
fn bracket_structural_errors() {
    let (line, msg) = parse_err("[EMOTION happy 1][END o.mp4 30]");
    assert_eq!(line, 1);
    assert!(msg.contains("[START"));

    let (_, msg) = parse_err("[START 5][START 6][END o.mp4 30]");
    assert!(msg.contains("duplicate [START]"));

    let (_, msg) = parse_err("[START 5][EMOTION happy 1]");
    assert!(msg.contains("missing terminal [END"));

    let (_, msg) = parse_err("[START 5][END o.mp4 30][EMOTION happy 1]");
    assert!(msg.contains("after the end directive"));

    let (_, msg) = parse_err("[START 5][EMOTION happy 1][RESOLUTION 640 480][END o.mp4 30]");
    assert!(msg.contains("before any content"));

    let (_, msg) =
        parse_err("[START 5][RESOLUTION 640 480][RESOLUTION 640 480][END o.mp4 30]");
    assert!(msg.contains("duplicate resolution"));
}

#[test]
fn bracket_token_errors() {
    let (_, msg) = parse_err("[START 5][WOBBLE hard][END o.mp4 30]");
    assert!(msg.contains("unknown directive '[WOBBLE]'"));

    let (line, msg) = parse_err("[START 5]\n[EMOTION happy 1 [END o.mp4 30]");
    assert_eq!(line, 2);
    assert!(msg.contains("missing closing ']'"));

    let (_, msg) = parse_err("[START five][END o.mp4 30]");
    assert!(msg.contains("not a number"));

    let (_, msg) = parse_err("[START 5][EMOTION happy 0][END o.mp4 30]");
    assert!(msg.contains("positive"));

    let (_, msg) = parse_err("[START 5][EMOTION happy -1][END o.mp4 30]");
    assert!(msg.contains("positive"));

    let (_, msg) = parse_err("[START 5][ESPEECH happy auto][END o.mp4 30]");
    assert!(msg.contains("utterance text"));

    let (_, msg) = parse_err("[START 5][EMOTION happy 1] stray words [END o.mp4 30]");
    assert!(msg.contains("unexpected text after [EMOTION]"));

    let (_, msg) = parse_err("[START 5][END o.mp4 29.97]");
    assert!(msg.contains("positive integer"));

    let (_, msg) = parse_err("[START 5][BACKGROUND red][END o.mp4 30]");
    assert!(msg.contains("invalid color"));

    let (_, msg) = parse_err("");
    assert!(msg.contains("empty script"));
}

#[test]
fn tag_script_parses() {
    let text = r##"
<resolution width="1280" height="720"/>
<background color="#102030"/>
<emotion name="smile" duration="1.5"/>
<espeech emotion="smile" duration="auto">Hello there.</espeech>
<textspeech duration="2.0">
  Wrapped   caption text.
</textspeech>
<insert src="clips/cut.mp4"/>
<end output="out.mp4" duration="12"/>
"##;
    let script = parse_script(text).unwrap();
    assert_eq!(script.directives.len(), 7);
    assert_eq!(
        script.directives[3].kind,
        DirectiveKind::EmotionalSpeech {
            emotion: "smile".to_string(),
            duration: DurationSpec::Auto,
            text: "Hello there.".to_string(),
        }
    );
    assert_eq!(
        script.directives[4].kind,
        DirectiveKind::TextSpeech {
            duration: DurationSpec::Seconds(2.0),
            text: "Wrapped caption text.".to_string(),
        }
    );

    // fps defaults to 30 when <end/> omits it.
    let framing = script.framing().unwrap();
    assert_eq!(framing.fps, Fps(DEFAULT_FPS));
    assert_eq!(framing.total_secs, 12.0);
}

#[test]
fn tag_end_fps_attribute_overrides_default() {
    let script =
        parse_script(r#"<emotion name="joy" duration="1"/><end output="o.mp4" duration="4" fps="60"/>"#)
            .unwrap();
    assert_eq!(script.framing().unwrap().fps, Fps(60));
}

#[test]
fn tag_block_errors() {
    let (_, msg) = parse_err(r#"<espeech emotion="joy" duration="auto">Hi.<end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("expected </espeech>"));

    let (line, msg) = parse_err(r#"<espeech emotion="joy" duration="auto">Hi."#);
    assert_eq!(line, 1);
    assert!(msg.contains("unterminated <espeech> block"));

    let (_, msg) = parse_err(r#"<espeech emotion="joy" duration="auto">Hi.</textspeech>"#);
    assert!(msg.contains("mismatched closing tag"));

    let (_, msg) = parse_err(r#"<espeech emotion="joy" duration="auto"></espeech><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("requires utterance text"));

    let (_, msg) = parse_err(r#"</espeech>"#);
    assert!(msg.contains("without an open block"));
}

#[test]
fn tag_attribute_errors() {
    let (_, msg) = parse_err(r#"<emotion духа="joy" duration="1"/><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("malformed attribute"));

    let (_, msg) = parse_err(r#"<emotion name="joy"/><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("missing required attribute 'duration'"));

    let (_, msg) = parse_err(r#"<emotion name="joy" duration="1" glow="yes"/><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("unknown attribute 'glow'"));

    let (_, msg) = parse_err(r#"<emotion name="joy" name="joy" duration="1"/><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("duplicate attribute 'name'"));

    let (_, msg) = parse_err(r#"<emotion name="joy" duration="1"><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("self-closing"));

    let (_, msg) = parse_err(r#"<wobble hard="yes"/><end output="o.mp4" duration="4"/>"#);
    assert!(msg.contains("unknown tag '<wobble>'"));

    let (_, msg) = parse_err(r#"<emotion name="joy" duration="1"/>"#);
    assert!(msg.contains("missing terminal <end"));

    let (_, msg) = parse_err(
        r#"<end output="o.mp4" duration="4"/><emotion name="joy" duration="1"/>"#,
    );
    assert!(msg.contains("after the end directive"));
}

#[test]
fn detection_rejects_other_leading_text() {
    let (_, msg) = parse_err("hello there");
    assert!(msg.contains("must start with"));
}
