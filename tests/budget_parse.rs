mod common;

use common::budget_alloc::BudgetAlloc;
use common::fixtures::{generated_chapter, generated_sheet, BOOK_CSS, BOOK_CSS_CLASSES, CHAPTER_XHTML};
use epub_stream_style::markup::{Event, Reader};
use epub_stream_style::{parse_sheet, Arena, ChapterStyler, StyleConfig, StyledEvent, Stylesheet};

#[global_allocator]
static ALLOC: BudgetAlloc = BudgetAlloc::new();

#[test]
fn sheet_parse_into_stack_arena_never_touches_heap() {
    let mut storage = [0u8; 4096];
    let mut arena = Arena::new(&mut storage);

    let ((selectors, count), stats) = ALLOC.measure(|| {
        let rules = parse_sheet(BOOK_CSS.into(), &mut arena);
        let mut selectors = [""; 8];
        for (slot, rule) in selectors.iter_mut().zip(rules) {
            *slot = rule.selector.to_str().unwrap_or("");
        }
        (selectors, rules.len())
    });

    assert_eq!(stats.allocations, 0, "heap used: {:?}", stats);
    assert_eq!(count, BOOK_CSS_CLASSES.len());
    assert_eq!(&selectors[..count], BOOK_CSS_CLASSES);
    assert!(arena.verify_canaries().is_ok());
}

#[test]
fn truncated_large_sheet_stays_off_heap() {
    let css = generated_sheet(800);
    let mut storage = vec![0u8; 128 * 1024];
    let mut arena = Arena::new(&mut storage);
    let config = StyleConfig::embedded();

    let (sheet, stats) = ALLOC.measure(|| Stylesheet::parse(css.as_str().into(), &mut arena, &config));

    assert_eq!(stats.allocations, 0, "heap used: {:?}", stats);
    assert_eq!(sheet.len(), config.limits.max_rules);
    assert_eq!(sheet.rules()[0].selector, "c0");
    assert_eq!(sheet.rules()[511].selector, "c511");
    assert!(arena.used() <= arena.capacity());
    assert!(arena.verify_canaries().is_ok());
}

#[test]
fn borrowed_buffer_reader_never_touches_heap() {
    let xhtml = generated_chapter(200, BOOK_CSS_CLASSES);
    let mut buffer = [0u8; 256];

    let (counts, stats) = ALLOC.measure(|| {
        let mut reader = Reader::new(xhtml.as_bytes(), xhtml.len(), &mut buffer[..]);
        let mut starts = 0usize;
        let mut texts = 0usize;
        loop {
            let event = reader
                .next_event()
                .unwrap_or_else(|err| panic!("markup error: {}", err));
            match event {
                Event::StartElement { .. } => starts += 1,
                Event::Text { .. } => texts += 1,
                Event::EndOfFile => break,
                _ => {}
            }
        }
        (starts, texts, reader.position())
    });

    assert_eq!(stats.allocations, 0, "heap used: {:?}", stats);
    assert_eq!(counts.0, 2 + 200 * 2);
    assert_eq!(counts.1, 200 * 3);
    assert_eq!(counts.2, xhtml.len());
}

#[test]
fn chapter_styling_never_touches_heap() {
    let mut storage = [0u8; 8192];
    let mut arena = Arena::new(&mut storage);
    let mut buffer = [0u8; 512];

    let (events, stats) = ALLOC.measure(|| {
        let config = StyleConfig::embedded();
        let external = Stylesheet::parse(BOOK_CSS.into(), &mut arena, &config);
        let mut styler = ChapterStyler::new(external, config);
        let mut reader = Reader::new(CHAPTER_XHTML.as_bytes(), CHAPTER_XHTML.len(), &mut buffer[..]);
        let mut styled_text = 0usize;
        let mut total = 0usize;
        styler
            .style_chapter(&mut reader, &mut arena, |event| {
                total += 1;
                if let StyledEvent::Text { style, .. } = event {
                    if style.any() {
                        styled_text += 1;
                    }
                }
            })
            .map(|()| (styled_text, total, styler.embedded_sheets().len()))
    });

    assert_eq!(stats.allocations, 0, "heap used: {:?}", stats);
    let (styled_text, total, embedded) = events.expect("chapter streams");
    assert_eq!(embedded, 1);
    assert_eq!(styled_text, 5);
    assert!(total > styled_text);
}
