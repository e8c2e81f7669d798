//! Layout and markup laws checked through the public API

use textstamp::rendering::layout::{layout, max_line_chars};
use textstamp::rendering::render_markup;
use textstamp::{CanvasDimensions, StyleOptions, VerticalPosition};

const CANVAS: CanvasDimensions = CanvasDimensions { width: 800, height: 600 };

fn corpus() -> Vec<&'static str> {
    vec![
        "Hello world",
        "The quick brown fox jumps over the lazy dog near the riverbank today",
        "a b c d e f g h i j k l m n o p q r s t u v w x y z",
        "Pneumonoultramicroscopicsilicovolcanoconiosis is a very long word indeed",
        "  leading and   trailing   whitespace  ",
        "single",
    ]
}

#[test]
fn every_word_appears_once_in_order() {
    for font_size_pt in [12, 24, 48, 96, 200] {
        let style = StyleOptions { font_size_pt, ..Default::default() };
        for text in corpus() {
            let result = layout(text, &style, CANVAS);
            let expected: Vec<&str> = text.split_whitespace().collect();
            assert_eq!(result.words(), expected, "font {} text {:?}", font_size_pt, text);
        }
    }
}

#[test]
fn lines_respect_wrap_width_unless_single_word() {
    for font_size_pt in [12, 24, 48, 96] {
        let style = StyleOptions { font_size_pt, ..Default::default() };
        let limit = max_line_chars(CANVAS.width, font_size_pt);
        for text in corpus() {
            for line in layout(text, &style, CANVAS).lines {
                let single_word = !line.text.contains(' ');
                assert!(
                    line.char_count() <= limit || single_word,
                    "line {:?} exceeds {} chars",
                    line.text,
                    limit
                );
            }
        }
    }
}

#[test]
fn hello_world_sits_on_one_centered_line() {
    let result = layout("Hello world", &StyleOptions::default(), CANVAS);
    assert_eq!(result.line_count(), 1);
    assert_eq!(result.lines[0].text, "Hello world");
    assert!((result.lines[0].y - 319.2).abs() < 1e-6);
    assert!((result.total_height - 57.6).abs() < 1e-6);
}

#[test]
fn long_text_wraps_and_reconstructs() {
    let text = "Rust makes systems programming safer while keeping performance high always";
    assert_eq!(text.split_whitespace().count(), 10);
    let result = layout(text, &StyleOptions::default(), CANVAS);
    assert!(result.line_count() > 1);
    let rebuilt: Vec<String> = result.lines.iter().map(|l| l.text.clone()).collect();
    assert_eq!(rebuilt.join(" "), text);
}

#[test]
fn position_policy_orders_first_line() {
    let text = "Some text that wraps across a couple of lines for the test";
    let first_y = |vertical_position| {
        let style = StyleOptions { vertical_position, ..Default::default() };
        layout(text, &style, CANVAS).lines[0].y
    };
    let top = first_y(VerticalPosition::Top);
    let middle = first_y(VerticalPosition::Middle);
    let bottom = first_y(VerticalPosition::Bottom);
    assert!(top < middle, "top {} middle {}", top, middle);
    assert!(middle < bottom, "middle {} bottom {}", middle, bottom);
}

#[test]
fn text_content_is_escaped() {
    let svg = render_markup(r#"<script>&"' alert"#, &StyleOptions::default(), CANVAS);
    for element in svg.split("<text ").skip(1) {
        let content = element
            .split_once('>')
            .and_then(|(_, rest)| rest.split_once("</text>"))
            .map(|(content, _)| content)
            .expect("text element");
        for reserved in ['<', '>', '\'', '"'] {
            assert!(!content.contains(reserved), "raw {:?} in {:?}", reserved, content);
        }
        // Only entity ampersands remain
        assert!(content.replace("&lt;", "").replace("&gt;", "").replace("&amp;", "")
            .replace("&quot;", "").replace("&apos;", "").find('&').is_none());
    }
    assert!(svg.contains("&lt;script&gt;&amp;&quot;&apos;"));
}
