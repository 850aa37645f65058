use std::fmt::Write as _;

/// Stylesheet in the shape calibre and Sigil conversions usually produce.
pub const BOOK_CSS: &str = r#"@charset "utf-8";
@import url("fonts.css");
/* Generated by calibre */
@page { margin-bottom: 5pt; margin-top: 5pt }
body { margin: 0 5pt; }
.calibre { display: block; font-size: 1em; padding: 0 }
.calibre1 { font-weight: bold; text-align: center }
.calibre2 { font-style: italic }
.indent { text-indent: 1.5em; text-align: justify }
h1.chapter { font-size: 2em }
.right { text-align: right; } /* signatures */
.smcap { font-variant: small-caps }
.noindent { text-indent: 0 }
@media amzn-kf8 { .kf8 { text-align: left } }
"#;

/// Classes `BOOK_CSS` turns into rules, in order.
pub const BOOK_CSS_CLASSES: &[&str] = &[
    "calibre1", "calibre2", "indent", "right", "noindent",
];

pub const CHAPTER_XHTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <title>Chapter 1</title>
  <link rel="stylesheet" type="text/css" href="../styles/book.css"/>
  <style type="text/css">
    /* chapter overrides */
    .epigraph { font-style: italic; text-align: right }
  </style>
</head>
<body class="calibre">
  <h1 class="calibre1">Loomings</h1>
  <p class="epigraph">Call me Ishmael.</p>
  <p class="indent">Some years ago, never mind how long precisely, having
  little or no money in my purse, I thought I would sail about a little.</p>
  <p class="indent calibre2" style="text-indent: 0">It is a way I have.</p>
  <hr class="calibre"/>
  <p class="right">The End</p>
</body>
</html>
"#;

/// A sheet with `rules` class rules, each padded by a comment.
pub fn generated_sheet(rules: usize) -> String {
    let mut css = String::new();
    for idx in 0..rules {
        let align = ["left", "right", "center", "justify"][idx % 4];
        let _ = writeln!(
            css,
            "/* rule {idx} */ .c{idx} {{ text-align: {align}; text-indent: {}px }}",
            idx % 40
        );
    }
    css
}

/// A chapter with `paragraphs` paragraphs cycling through `classes`.
pub fn generated_chapter(paragraphs: usize, classes: &[&str]) -> String {
    let mut xhtml = String::from("<html><body>\n");
    for idx in 0..paragraphs {
        let class = classes[idx % classes.len()];
        let _ = writeln!(
            xhtml,
            "<p class=\"{class}\">Paragraph {idx} <em>with</em> some text.</p>"
        );
    }
    xhtml.push_str("</body></html>\n");
    xhtml
}
