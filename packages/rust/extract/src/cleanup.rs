//! Cleanup pipeline for extracted adopted-text prose.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The passes remove procedural boilerplate (sitting notes, speaker lists,
//! rule and procedure references) that the plenary documents interleave with
//! the adopted text itself.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw paragraph text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_tags(&result);
    result = collapse_whitespace(&result);
    result = remove_sitting_notes(&result);
    result = remove_debate_markers(&result);
    result = remove_rule_references(&result);
    result = remove_document_references(&result);
    result = remove_chair_remarks(&result);
    result = remove_procedural_sentences(&result);
    result = collapse_whitespace(&result);

    result
}

/// Delete every match of every pattern, in order.
fn remove_all(text: &str, patterns: &[Regex]) -> String {
    patterns.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 1: Strip leftover tags
// ---------------------------------------------------------------------------

/// Remove any markup that survived text extraction (escaped tags in the source).
fn strip_tags(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    TAG_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Collapse whitespace
// ---------------------------------------------------------------------------

/// Turn every whitespace run (newlines included) into a single space and trim.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Sitting and voting-time notes
// ---------------------------------------------------------------------------

fn remove_sitting_notes(text: &str) -> String {
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        compile(&[
            r"(?i)\(The sitting (?:was suspended|opened|closed|ended) at.*?\)",
            r"(?i)\(Voting time ended at.*?\)",
        ])
    });

    remove_all(text, &PATTERNS)
}

// ---------------------------------------------------------------------------
// Pass 4: Debate markers and bracketed speaker lists
// ---------------------------------------------------------------------------

fn remove_debate_markers(text: &str) -> String {
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        compile(&[
            r"(?i)\((?:debat|stemming|vraag|interventie)\)",
            r"(?i)\(Het woord wordt gevoerd door:.*?\)",
        ])
    });

    remove_all(text, &PATTERNS)
}

// ---------------------------------------------------------------------------
// Pass 5: Rule / article references
// ---------------------------------------------------------------------------

/// Remove references like `(artikel 149, lid 2)`, `[Rule 143]` or `(NL punt 4)`.
fn remove_rule_references(text: &str) -> String {
    static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)[(\[]\s*(?:[a-z]{2,3}\s*)?(?:artikel|rule|punt|item)\s*\d+(?:,\s*lid\s*\d+)?\s*(?:\s+\w+)?\s*[)\]]",
        )
        .expect("valid regex")
    });

    RULE_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 6: Document, procedure and link references
// ---------------------------------------------------------------------------

fn remove_document_references(text: &str) -> String {
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        compile(&[
            // [COM2023-0123] / [A9-0123/2023]
            r"\[(?:COM|A)\d+-\d+(?:/\d+)?\]",
            r"\(?https?://[^\s]+?\)",
            r"\[\s*\d{4}/\d{4}\((?:COD|INI|RSP|IMM|NLE)\)\]",
            r"\[\s*\d{5}/\d{4}\s*-\s*C\d+-\d+/\d+\s*-\s*\d{4}/\d{4}\(NLE\)\]",
            r"\(\x{201C}Stemmingsuitslagen\x{201D}, punt \d+\)",
        ])
    });

    remove_all(text, &PATTERNS)
}

// ---------------------------------------------------------------------------
// Pass 7: President's procedural remarks
// ---------------------------------------------------------------------------

fn remove_chair_remarks(text: &str) -> String {
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        compile(&[
            concat!(
                r"\(de Voorzitter(?: maakt na de toespraak van.*?| weigert in te gaan op.*?",
                r"| stemt toe| herinnert eraan dat de gedragsregels moeten worden nageleefd",
                r"| neemt er akte van)?\)",
            ),
            r"(?i)\(zie bijlage.*?\)",
        ])
    });

    remove_all(text, &PATTERNS)
}

// ---------------------------------------------------------------------------
// Pass 8: Procedural sentences
// ---------------------------------------------------------------------------

fn remove_procedural_sentences(text: &str) -> String {
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        compile(&[
            r"\(\s*De vergadering wordt om.*?geschorst\.\)",
            r"\(\s*De vergadering wordt om.*?hervat\.\)",
            r"Volgens de \x{201C}catch the eye\x{201D}-procedure wordt het woord gevoerd door.*?\.",
            r"Het woord wordt gevoerd door .*?\.",
            r"De vergadering wordt om \d{1,2}\.\d{2} uur gesloten.",
            r"De vergadering wordt om \d{1,2}\.\d{2} uur geopend.",
            r"Het debat wordt gesloten.",
            r"Stemming:.*?\.",
        ])
    });

    remove_all(text, &PATTERNS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
