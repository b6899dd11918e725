use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

/// Normalized tokens must be strictly longer than this.
pub const MIN_TOKEN_LEN: usize = 2;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split text into raw tokens (NFKC, lowercase). Every returned token occupies
/// one position in the document, whether or not it survives [`normalize`].
pub fn raw_tokens(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Normalize one raw token: stopword removal, stemming and the length floor.
/// Returns `None` when the token is rejected.
pub fn normalize(raw: &str) -> Option<String> {
    let lowered = raw.nfkc().collect::<String>().to_lowercase();
    if is_stopword(&lowered) { return None; }
    let stem = STEMMER.stem(&lowered).to_string();
    if stem.chars().count() <= MIN_TOKEN_LEN || is_stopword(&stem) {
        return None;
    }
    Some(stem)
}

/// Tokenize text into accepted (term, position) pairs. Positions are 1-based
/// and advance over rejected tokens too.
pub fn tokenize(text: &str) -> Vec<(String, u32)> {
    let mut tokens = Vec::new();
    for (idx, raw) in raw_tokens(text).iter().enumerate() {
        if let Some(term) = normalize(raw) {
            tokens.push((term, idx as u32 + 1));
        }
    }
    tokens
}

/// Normalized query terms in query order, duplicates kept.
pub fn query_terms(query: &str) -> Vec<String> {
    raw_tokens(query).iter().filter_map(|raw| normalize(raw)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|(w, _)| w == "run"));
    }

    #[test]
    fn positions_count_rejected_tokens() {
        // "the" and "of" are stopwords, "go" is too short
        let t = tokenize("the history of go compilers");
        let positions: Vec<u32> = t.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![2, 5]);
    }

    #[test]
    fn short_and_stopwords_rejected() {
        assert_eq!(normalize("the"), None);
        assert_eq!(normalize("ox"), None);
        assert_eq!(normalize("Graph").as_deref(), Some("graph"));
    }
}
