use anyhow::Result;
use pycourse::course::Course;
use pycourse::printer::render_segments;
use pycourse::tutor::links::links;
use pycourse::tutor::{parse_segments, Segment};

#[test]
fn links_code_and_text_are_split() {
    let reply = "You can learn about lists in [[Part 2: Lists]](goto:part-2|2-2-lists). Try `len(levels)` next.";
    let segments = parse_segments(reply);
    assert_eq!(
        segments,
        vec![
            Segment::Text("You can learn about lists in ".into()),
            Segment::Link {
                label: "Part 2: Lists".into(),
                module_id: "part-2".into(),
                section_id: "2-2-lists".into(),
            },
            Segment::Text(". Try ".into()),
            Segment::Code("len(levels)".into()),
            Segment::Text(" next.".into()),
        ]
    );
}

#[test]
fn malformed_links_stay_text() {
    let reply = "See [[Lists]](goto:part-2) and [[Broken](goto:a|b).";
    assert_eq!(parse_segments(reply), vec![Segment::Text(reply.into())]);
    assert!(links(reply).is_empty());
}

#[test]
fn plain_text_is_one_segment() {
    assert_eq!(parse_segments("No links here."), vec![Segment::Text("No links here.".into())]);
    assert!(parse_segments("").is_empty());
}

#[test]
fn links_resolve_against_the_catalog() -> Result<()> {
    let course = Course::builtin()?;
    let found = links("[[Pandas]](goto:part-2|2-8-pandas) [[Wrong module]](goto:part-1|2-8-pandas)");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].resolve(&course).map(|l| l.section.id.as_str()), Some("2-8-pandas"));
    assert!(found[1].resolve(&course).is_none());
    assert!(Segment::Text("x".into()).resolve(&course).is_none());
    Ok(())
}

#[test]
fn plain_rendering_shows_link_targets() {
    let segments = parse_segments("Read [[Variables]](goto:part-1|3-variables) and `print()`.");
    assert_eq!(render_segments(&segments, false), "Read Variables [3-variables] and `print()`.");
}
