//! Den Danske Ordbog article pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::model::entry::{Example, FixedExpression, RawEntry, Sense};
use crate::services::normalize::clean_headword;

fn sel(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| sel("div.artikel"));
static HEADWORD: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionBoxTop span.match"));
static POS: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionBoxTop span.tekstmedium"));
static SENSES: LazyLock<Selector> = LazyLock::new(|| sel("#content-betydninger"));
static DEF_NUMBER: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionNumber"));
static GLOSS: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div.definitionBox[id^="betydning-"] span.definition"#));
static DEFINITION: LazyLock<Selector> = LazyLock::new(|| sel("span.definition"));
static GRAMMAR: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionBox.grammatik"));
static INLINE_LIST: LazyLock<Selector> = LazyLock::new(|| sel("span.inlineList"));
static ONYM: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionBox.onym"));
static RELATED: LazyLock<Selector> = LazyLock::new(|| sel("div.definitionBox.rel-begreber"));
static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a"));
static CITATION: LazyLock<Selector> = LazyLock::new(|| sel("div.citat-box"));
static CITATION_TEXT: LazyLock<Selector> = LazyLock::new(|| sel("span.citat"));
static CITATION_SOURCE: LazyLock<Selector> = LazyLock::new(|| sel("span.kilde"));
static PRONUNCIATION: LazyLock<Selector> = LazyLock::new(|| sel("div#id-udt span.tekstmedium"));
static IPA: LazyLock<Selector> = LazyLock::new(|| sel("span.lydskrift"));
static MP3: LazyLock<Selector> = LazyLock::new(|| sel(r#"a[href$=".mp3"]"#));
static LABEL: LazyLock<Selector> = LazyLock::new(|| sel("span.stempel"));
static USAGE: LazyLock<Selector> = LazyLock::new(|| sel("span.tekstnormal"));
static EXPRESSIONS: LazyLock<Selector> = LazyLock::new(|| sel("div.artikel #content-faste-udtryk"));
static EXPRESSION_HEAD: LazyLock<Selector> = LazyLock::new(|| sel(r#"div[id^="udtryk-"]"#));
static MATCH: LazyLock<Selector> = LazyLock::new(|| sel("span.match"));
static FORMATIONS: LazyLock<Selector> = LazyLock::new(|| sel("#content-orddannelser div.definitionBox"));

static EXPRESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^udtryk-\d+$").expect("expression id pattern"));
static SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[A-Za-zæøåÆØÅ]{1,6}$").expect("suffix pattern"));
static TRAILING_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+$").expect("digits pattern"));

/// Site navigation texts that show up inside link lists.
const UNWANTED_LINKS: [&str; 3] = [
    "...vis mere",
    "...vis mindre",
    "Læs mere om Den Danske Begrebsordbog",
];

/// Parses one saved article page.
///
/// Fails when the article, its headword or its sense list is missing; callers
/// skip such pages.
pub fn parse(html: &str, source: &str) -> Result<RawEntry, ParseError> {
    let doc = Html::parse_document(html);

    let article = doc.select(&ARTICLE).next().ok_or(ParseError::MissingArticle)?;

    let raw_headword = article
        .select(&HEADWORD)
        .next()
        .map(text_of)
        .ok_or(ParseError::MissingHeadword)?;
    let headword = clean_headword(&raw_headword);
    if headword.is_empty() {
        return Err(ParseError::MissingHeadword);
    }

    let senses_container = doc.select(&SENSES).next().ok_or(ParseError::MissingSenses)?;

    let pos = article
        .select(&POS)
        .next()
        .map(text_of)
        .filter(|p| !p.is_empty());

    let (phonetic, audio_urls) = parse_pronunciations(&doc);

    let mut senses = parse_senses(senses_container, source);
    let expressions = parse_fixed_expressions(&doc);
    if !expressions.is_empty() {
        // expressions are listed per article; they hang off the primary sense
        match senses.first_mut() {
            Some(first) => first.fixed_expressions = expressions,
            None => senses.push(Sense {
                fixed_expressions: expressions,
                ..Default::default()
            }),
        }
    }

    let wordforms = labelled_text(&doc, "Bøjning")
        .map(|forms| expand_wordforms(&headword, &raw_headword, &forms))
        .unwrap_or_default();

    Ok(RawEntry {
        headword,
        pos,
        phonetic,
        senses,
        audio_urls,
        wordforms,
        etymology: labelled_text(&doc, "Oprindelse"),
        word_formations: parse_word_formations(&doc),
        source: source.to_string(),
    })
}

fn text_of(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_class(el: &ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn next_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.next_siblings().filter_map(ElementRef::wrap)
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn clean_links<'a>(links: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    links
        .map(text_of)
        .filter(|t| !UNWANTED_LINKS.contains(&t.as_str()))
        .map(|t| TRAILING_DIGITS_RE.replace(&t, "").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_example(cite: ElementRef) -> Option<Example> {
    let text = cite.select(&CITATION_TEXT).next().map(text_of)?;
    let source = cite
        .select(&CITATION_SOURCE)
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty());
    Some(Example { text, source })
}

fn grammar_of(block: ElementRef) -> String {
    match block.select(&INLINE_LIST).next() {
        Some(inline) => text_of(inline),
        None => text_of(block),
    }
}

fn parse_senses(container: ElementRef, source: &str) -> Vec<Sense> {
    let numbers: Vec<ElementRef> = container.select(&DEF_NUMBER).collect();

    if numbers.is_empty() {
        return child_elements(container)
            .filter(|el| has_class(el, "definitionIndent"))
            .map(|indent| parse_sense(None, indent))
            .collect();
    }

    numbers
        .into_iter()
        .filter_map(|num| {
            let number = text_of(num);
            let indent = next_elements(num)
                .take_while(|el| !has_class(el, "definitionNumber"))
                .find(|el| has_class(el, "definitionIndent"));
            match indent {
                Some(indent) => Some(parse_sense(Some(number), indent)),
                None => {
                    tracing::warn!(%source, sense = %number, "sense without definitionIndent");
                    None
                }
            }
        })
        .collect()
}

fn parse_sense(number: Option<String>, indent: ElementRef) -> Sense {
    Sense {
        number: number.filter(|n| !n.is_empty()),
        gloss: indent.select(&GLOSS).next().map(text_of).unwrap_or_default(),
        grammar: indent.select(&GRAMMAR).next().map(grammar_of),
        examples: indent.select(&CITATION).filter_map(parse_example).collect(),
        see_also: indent
            .select(&ONYM)
            .next()
            .map(|b| clean_links(b.select(&LINK)))
            .unwrap_or_default(),
        related: indent
            .select(&RELATED)
            .next()
            .map(|b| clean_links(b.select(&LINK)))
            .unwrap_or_default(),
        fixed_expressions: Vec::new(),
    }
}

/// First IPA block is the transcription; every linked mp3 is kept.
fn parse_pronunciations(doc: &Html) -> (Option<String>, Vec<String>) {
    let Some(block) = doc.select(&PRONUNCIATION).next() else {
        return (None, Vec::new());
    };

    let mut phonetic = None;
    let mut audio = Vec::new();

    for ipa in block.select(&IPA) {
        let text = text_of(ipa);
        if phonetic.is_none() && !text.is_empty() {
            phonetic = Some(text);
        }
        if let Some(href) = ipa.select(&MP3).next().and_then(|a| a.value().attr("href")) {
            audio.push(href.trim().to_string());
        }
    }

    (phonetic, audio)
}

fn is_expression_head(el: &ElementRef) -> bool {
    el.value().name() == "div"
        && el
            .value()
            .attr("id")
            .is_some_and(|id| EXPRESSION_ID_RE.is_match(id))
}

fn parse_fixed_expressions(doc: &Html) -> Vec<FixedExpression> {
    let Some(section) = doc.select(&EXPRESSIONS).next() else {
        return Vec::new();
    };

    let mut out = Vec::new();

    for head in section.select(&EXPRESSION_HEAD) {
        if !is_expression_head(&head) {
            continue;
        }
        let Some(expression) = head.select(&MATCH).next().map(text_of) else {
            continue;
        };
        let id = head.value().attr("id").unwrap_or_default();

        let mut expr = FixedExpression {
            expression,
            ..Default::default()
        };
        let mut definitions: Vec<String> = Vec::new();

        for node in next_elements(head).take_while(|el| !is_expression_head(el)) {
            if !has_class(&node, "definitionIndent") {
                continue;
            }
            for block in child_elements(node).filter(|el| has_class(el, "definitionBox")) {
                let block_id = block.value().attr("id").unwrap_or_default();

                if block_id.starts_with(&format!("{id}-betydning")) {
                    let text = match block.select(&DEFINITION).next() {
                        Some(def) => text_of(def),
                        None => text_of(block),
                    };
                    if !text.is_empty() {
                        definitions.push(text);
                    }
                } else if has_class(&block, "onym") || has_class(&block, "rel-begreber") {
                    continue;
                } else if has_class(&block, "grammatik") {
                    if expr.grammar.is_none() {
                        expr.grammar = Some(grammar_of(block));
                    }
                } else if block
                    .select(&LABEL)
                    .next()
                    .is_some_and(|label| text_of(label) == "SPROGBRUG")
                {
                    if expr.usage.is_none() {
                        expr.usage = block.select(&USAGE).next().map(text_of);
                    }
                } else if let Some(example) = block.select(&CITATION).next().and_then(parse_example) {
                    expr.examples.push(example);
                }
            }
        }

        expr.gloss = definitions.join("; ");
        out.push(expr);
    }

    out
}

/// Text of the element following a `span.stempel` label, e.g. "Bøjning".
fn labelled_text(doc: &Html, label: &str) -> Option<String> {
    let stamp = doc.select(&LABEL).find(|el| text_of(*el) == label)?;
    let value = next_elements(stamp).find(|el| el.value().name() == "span")?;
    Some(text_of(value)).filter(|t| !t.is_empty())
}

/// "-et, -e, huse" -> "huset, huse, huse"; the headword itself is left out.
fn expand_wordforms(headword: &str, raw_headword: &str, forms: &str) -> Vec<String> {
    forms
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty() && *f != raw_headword && *f != headword)
        .map(|f| {
            if SUFFIX_RE.is_match(f) {
                format!("{headword}{}", &f[1..])
            } else {
                f.to_string()
            }
        })
        .collect()
}

fn parse_word_formations(doc: &Html) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for block in doc.select(&FORMATIONS) {
        let Some(category) = block.select(&LABEL).next().map(text_of) else {
            continue;
        };
        let mut items = Vec::new();

        if let Some(inline) = block.select(&INLINE_LIST).next() {
            let mut current: Option<(String, String)> = None;

            for child in inline.children() {
                if let Some(el) = ElementRef::wrap(child) {
                    if el.value().name() == "a" {
                        items.extend(current.take().map(finish_formation));
                        current = Some((text_of(el), String::new()));
                    }
                } else if let Some(text) = child.value().as_text() {
                    if let Some((_, tail)) = current.as_mut() {
                        tail.push_str(text);
                    }
                }
            }
            items.extend(current.take().map(finish_formation));
        }

        out.entry(category).or_default().extend(items);
    }

    out
}

fn finish_formation((form, tail): (String, String)) -> String {
    let tail = tail.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace());
    if tail.is_empty() {
        form
    } else {
        format!("{form} {tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUS: &str = include_str!("../../tests/fixtures/hus.html");
    const SINGLE_SENSE: &str = include_str!("../../tests/fixtures/kat.html");

    #[test]
    fn parses_headword_pos_and_pronunciation() {
        let e = parse(HUS, "hus.html").unwrap();

        assert_eq!(e.headword, "hus");
        assert_eq!(e.pos.as_deref(), Some("substantiv, intetkøn"));
        assert_eq!(e.phonetic.as_deref(), Some("[ˈhuːˀs]"));
        assert_eq!(
            e.audio_urls,
            vec![
                "https://static.ordnet.dk/mp3/11021/11021951_1.mp3",
                "https://static.ordnet.dk/mp3/11021/11021951_2.mp3",
            ]
        );
        assert_eq!(e.source, "hus.html");
    }

    #[test]
    fn parses_numbered_senses() {
        let e = parse(HUS, "hus.html").unwrap();

        assert_eq!(e.senses.len(), 2);
        let first = &e.senses[0];
        assert_eq!(first.number.as_deref(), Some("1"));
        assert_eq!(first.gloss, "bygning der er beregnet til beboelse");
        assert_eq!(first.grammar.as_deref(), Some("ofte i sammensætninger"));
        assert_eq!(first.see_also, vec!["bolig"]);
        assert_eq!(first.related, vec!["villa", "rækkehus"]);
        assert_eq!(first.examples.len(), 2);
        assert_eq!(first.examples[0].text, "de boede i et stort hus");
        assert_eq!(first.examples[0].source.as_deref(), Some("Berl.Tid.1999"));
        assert_eq!(first.examples[1].source, None);
        assert_eq!(e.senses[1].gloss, "husstand; familie");
        assert!(e.senses[1].fixed_expressions.is_empty());
    }

    #[test]
    fn attaches_fixed_expressions_to_first_sense() {
        let e = parse(HUS, "hus.html").unwrap();
        let exprs = &e.senses[0].fixed_expressions;

        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].expression, "holde hus");
        assert_eq!(exprs[0].gloss, "være sparsommelig; styre en husholdning");
        assert_eq!(exprs[0].grammar.as_deref(), Some("med præp. med"));
        assert_eq!(exprs[0].usage.as_deref(), Some("hverdagssprog"));
        assert_eq!(exprs[0].examples[0].text, "hun holder hus med pengene");
        assert_eq!(exprs[1].expression, "for fulde huse");
        assert_eq!(exprs[1].gloss, "med mange tilskuere");
    }

    #[test]
    fn parses_wordforms_etymology_and_formations() {
        let e = parse(HUS, "hus.html").unwrap();

        assert_eq!(e.wordforms, vec!["huset", "huse", "husene"]);
        assert_eq!(e.etymology.as_deref(), Some("norrønt hús"));
        assert_eq!(
            e.word_formations.get("Sammensætninger"),
            Some(&vec!["husdyr".to_string(), "sommerhus (i betydning 1)".to_string()])
        );
        assert_eq!(
            e.word_formations.get("Afledninger"),
            Some(&vec!["huslig".to_string()])
        );
    }

    #[test]
    fn unnumbered_senses_fall_back_to_indents() {
        let e = parse(SINGLE_SENSE, "kat.html").unwrap();

        assert_eq!(e.headword, "kat");
        assert_eq!(e.pos.as_deref(), Some("substantiv, fælleskøn"));
        assert_eq!(e.phonetic, None);
        assert!(e.audio_urls.is_empty());
        assert_eq!(e.senses.len(), 1);
        assert_eq!(e.senses[0].number, None);
        assert_eq!(e.senses[0].gloss, "lille pattedyr der holdes som kæledyr");
        assert!(e.wordforms.is_empty());
        assert!(e.word_formations.is_empty());
    }

    #[test]
    fn missing_markers_are_reported() {
        assert_eq!(
            parse("<html><body><p>Ingen resultater</p></body></html>", "x").unwrap_err(),
            ParseError::MissingArticle
        );
        assert_eq!(
            parse(r#"<div class="artikel"><div id="content-betydninger"></div></div>"#, "x").unwrap_err(),
            ParseError::MissingHeadword
        );
        assert_eq!(
            parse(
                r#"<div class="artikel"><div class="definitionBoxTop"><span class="match">hus</span></div></div>"#,
                "x"
            )
            .unwrap_err(),
            ParseError::MissingSenses
        );
    }

    #[test]
    fn expressions_without_senses_get_their_own_sense() {
        let html = r#"
            <div class="artikel">
              <div class="definitionBoxTop"><span class="match">ad</span></div>
              <div id="content-betydninger"></div>
              <div id="content-faste-udtryk">
                <div id="udtryk-1"><span class="match">ad åre</span></div>
              </div>
            </div>"#;

        let e = parse(html, "ad.html").unwrap();

        assert_eq!(e.senses.len(), 1);
        assert_eq!(e.senses[0].gloss, "");
        assert_eq!(e.senses[0].fixed_expressions[0].expression, "ad åre");
    }

    #[test]
    fn wordform_suffixes_expand_against_headword() {
        assert_eq!(
            expand_wordforms("bil", "bil1", "-en, -er, bil, biler"),
            vec!["bilen", "biler", "biler"]
        );
    }
}
