use shx_font::{Font, FontKind, PathEvent, RecordingSink, RenderOptions, ShxError};
use std::io::Cursor;

/// Surfaces the crate's `trace!`/`debug!` records when a test fails; run
/// with `RUST_LOG=shx_font=trace` to see them. Safe to call from every test
/// since the underlying logger only initializes once per process.
fn init_logging() {
    let _ = env_logger::try_init();
}

fn shapes_font_bytes(glyphs: &[(u16, &[u8])], above: u8, below: u8, modes: u8) -> Vec<u8> {
    let mut descriptor = Vec::new();
    descriptor.extend_from_slice(b"TestFont\x00");
    descriptor.push(above);
    descriptor.push(below);
    descriptor.push(modes);

    let mut directory = Vec::new();
    directory.extend_from_slice(&0u16.to_le_bytes());
    directory.extend_from_slice(&(descriptor.len() as u16).to_le_bytes());
    for (index, body) in glyphs {
        directory.extend_from_slice(&index.to_le_bytes());
        directory.extend_from_slice(&(body.len() as u16).to_le_bytes());
    }

    let mut data = Vec::new();
    data.extend_from_slice(b"AutoCAD-86 shapes 1.0\x00");
    data.extend_from_slice(&[0x1A, 0x00]); // header terminator bytes
    data.extend_from_slice(&1u16.to_le_bytes()); // start
    data.extend_from_slice(&0xFFu16.to_le_bytes()); // end
    data.extend_from_slice(&((glyphs.len() + 1) as u16).to_le_bytes()); // count
    data.extend_from_slice(&directory);
    data.extend_from_slice(&descriptor);
    for (_, body) in glyphs {
        data.extend_from_slice(body);
    }
    data
}

fn render(glyphs: &[(u16, &[u8])], text: &str) -> Result<(RecordingSink, Font), ShxError> {
    init_logging();
    let bytes = shapes_font_bytes(glyphs, 1, 0, 0);
    let font = Font::parse(Cursor::new(bytes))?;
    let mut sink = RecordingSink::new();
    let options = RenderOptions {
        horizontal: true,
        font_size: 1.0,
    };
    font.render(&mut sink, text, options)?;
    Ok((sink, font))
}

#[test]
fn parses_shapes_container_header_and_descriptor() {
    let (_, font) = render(&[(0x41, &[0x00])], "").unwrap();
    assert_eq!(font.kind, FontKind::Shapes);
    assert_eq!(font.font_name, "TestFont");
    assert_eq!(font.above, 1);
}

#[test]
fn unknown_code_points_are_silently_skipped() {
    let (sink, _) = render(&[(0x41, &[0x14, 0x00])], "\u{1}B").unwrap();
    // Neither "\u{1}" nor 'B' (0x42) are in the glyph table; 'A' is absent
    // from the input text entirely, so nothing should be emitted.
    assert!(sink.events.is_empty());
}

#[test]
fn renders_a_single_vector_move() {
    let (sink, _) = render(&[(b'A' as u16, &[0x14, 0x00])], "A").unwrap();
    assert_eq!(
        sink.events,
        vec![
            PathEvent::Line {
                x0: 0.0,
                y0: 0.0,
                x1: 0.0,
                y1: 1.0
            },
            PathEvent::NewPath,
        ]
    );
}

#[test]
fn position_and_scale_persist_across_characters() {
    // 'A' moves one unit east; 'B' moves another unit east from there.
    let (sink, _) = render(
        &[(b'A' as u16, &[0x10, 0x00]), (b'B' as u16, &[0x10, 0x00])],
        "AB",
    )
    .unwrap();
    assert_eq!(
        sink.events,
        vec![
            PathEvent::Line {
                x0: 0.0,
                y0: 0.0,
                x1: 1.0,
                y1: 0.0
            },
            PathEvent::NewPath,
            PathEvent::Line {
                x0: 1.0,
                y0: 0.0,
                x1: 2.0,
                y1: 0.0
            },
            PathEvent::NewPath,
        ]
    );
}

#[test]
fn draw_subshape_inlines_a_sibling_glyph() {
    let (sink, _) = render(
        &[
            (b'A' as u16, &[0x07, b'B' as u8, 0x00]),
            (b'B' as u16, &[0x10, 0x00]),
        ],
        "A",
    )
    .unwrap();
    assert_eq!(
        sink.events,
        vec![
            PathEvent::Line {
                x0: 0.0,
                y0: 0.0,
                x1: 1.0,
                y1: 0.0
            },
            PathEvent::NewPath,
            PathEvent::NewPath,
        ]
    );
}

#[test]
fn pop_on_empty_stack_reports_underflow_with_glyph_context() {
    let err = render(&[(b'A' as u16, &[0x06, 0x00])], "A").unwrap_err();
    match err {
        ShxError::StackUnderflow { glyph } => assert_eq!(glyph, b'A' as u16),
        other => panic!("expected StackUnderflow, got {other:?}"),
    }
}

#[test]
fn unsupported_format_token_is_rejected() {
    init_logging();
    let mut data = b"AutoCAD-86 notashape 1.0\x00".to_vec();
    data.extend_from_slice(&[0x1A, 0x00]);
    let err = Font::parse(Cursor::new(data)).unwrap_err();
    assert!(matches!(err, ShxError::UnsupportedFormat(_)));
}

#[test]
fn truncated_header_is_reported() {
    init_logging();
    // Three well-formed tokens but no terminator bytes follow, and the
    // stream ends there — the header line parses, but reading past it fails.
    let data = b"AutoCAD-86 shapes 1.0\x00".to_vec();
    let err = Font::parse(Cursor::new(data)).unwrap_err();
    assert!(matches!(err, ShxError::TruncatedStream(_)));
}
