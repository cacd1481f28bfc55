//! Narration text preparation.
//!
//! Two independent views are derived from one script:
//! - speech chunks: sentence/clause-bounded units sized for one synthesis call
//! - scene paragraphs: blank-line-delimited blocks used for scene segmentation
//!
//! All functions here are total over string input; empty input yields empty output.

use std::sync::LazyLock;

use regex::Regex;

/// Default word budget for one speech-synthesis chunk.
pub const DEFAULT_MAX_WORDS: usize = 25;

/// Labels a script writer puts at the start of a line to mark who is speaking.
const LINE_LABELS: &[&str] = &["เสียงบรรยาย:", "เปิดเรื่อง:", "Narrator:", "Narration:", "Opening:"];

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '\n'];

static STAGE_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("static regex"));

static LINE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    let alts = LINE_LABELS
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?m)^(?:{alts})\s*")).expect("static regex")
});

// Comma, semicolon, and the two conjunctions "and"/"but" as they appear in Thai scripts.
static CLAUSE_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",|;|และ|แต่").expect("static regex"));

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("static regex"));

/// Remove bracketed stage directions and leading speaker labels, then trim.
pub fn clean_for_speech(text: &str) -> String {
    let no_directions = STAGE_DIRECTION.replace_all(text, "");
    let no_labels = LINE_LABEL.replace_all(&no_directions, "");
    no_labels.trim().to_string()
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into ordered, non-empty speech chunks of at most `max_words` words.
///
/// Sentences end at `.`, `!`, `?` or a newline; the terminator stays with its sentence. A sentence
/// over budget is cut at clause delimiters and the clause pieces are packed greedily. A single
/// clause piece longer than `max_words` is emitted whole.
pub fn split_into_speech_chunks(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let mut out = Vec::new();

    for sentence in split_sentences(text) {
        if word_count(&sentence) <= max_words {
            out.push(sentence);
            continue;
        }
        pack_clauses(&sentence, max_words, &mut out);
    }

    out
}

/// Split on blank-line boundaries, trimming each paragraph and dropping empty ones.
pub fn split_into_scene_paragraphs(text: &str) -> Vec<String> {
    BLANK_LINE
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut cur = String::new();

    for ch in text.chars() {
        cur.push(ch);
        if SENTENCE_TERMINATORS.contains(&ch) {
            push_trimmed(&mut sentences, &cur);
            cur.clear();
        }
    }
    // Trailing text without a terminator is still a sentence.
    push_trimmed(&mut sentences, &cur);

    sentences
}

fn pack_clauses(sentence: &str, max_words: usize, out: &mut Vec<String>) {
    let mut part = String::new();

    for piece in clause_pieces(sentence) {
        let candidate_words =
            word_count(&part) + word_count(piece) - joined_word_overlap(&part, piece);
        if candidate_words > max_words && word_count(&part) > 0 {
            push_trimmed(out, &part);
            part.clear();
        }
        part.push_str(piece);
    }
    push_trimmed(out, &part);
}

/// Clause pieces with their trailing delimiter attached, in order.
fn clause_pieces(sentence: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for m in CLAUSE_DELIMITER.find_iter(sentence) {
        pieces.push(&sentence[start..m.end()]);
        start = m.end();
    }
    if start < sentence.len() {
        pieces.push(&sentence[start..]);
    }
    pieces
}

/// 1 when appending `b` directly to `a` fuses `a`'s last word with `b`'s first word.
fn joined_word_overlap(a: &str, b: &str) -> usize {
    let a_open = a.chars().last().is_some_and(|c| !c.is_whitespace());
    let b_open = b.chars().next().is_some_and(|c| !c.is_whitespace());
    usize::from(a_open && b_open)
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let t = s.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}
