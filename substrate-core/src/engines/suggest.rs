/// Closest-window match used to decorate `NeedleNotFound`/`ContextNotFound`
/// errors with a "did you mean?" hint. Adapted from the file-tool find
/// helper: slide a window of `needle_lines` across `source_lines` and score
/// each position by average per-line Levenshtein similarity.
#[derive(Debug, Clone)]
pub struct ClosestMatch {
    pub matched_lines: Vec<String>,
    pub start_index: usize,
    pub similarity: f64,
}

impl ClosestMatch {
    pub fn feedback(&self) -> String {
        let mut out = format!(
            "Found closest match with {:.1}% similarity at line {}\n\nClosest match:\n",
            self.similarity * 100.0,
            self.start_index + 1
        );
        for line in &self.matched_lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

pub fn find_closest(source: &[String], needle: &[String]) -> Option<ClosestMatch> {
    if needle.is_empty() || source.is_empty() || needle.len() > source.len() {
        return None;
    }

    let mut best: Option<(usize, f64, Vec<String>)> = None;
    for i in 0..=(source.len() - needle.len()) {
        let window = &source[i..i + needle.len()];
        let similarity = average_similarity(window, needle);
        match &best {
            None => best = Some((i, similarity, window.to_vec())),
            Some((_, best_sim, _)) if similarity > *best_sim => {
                best = Some((i, similarity, window.to_vec()));
            }
            _ => {}
        }
    }

    best.map(|(start_index, similarity, matched_lines)| ClosestMatch {
        matched_lines,
        start_index,
        similarity,
    })
}

fn average_similarity(window: &[String], needle: &[String]) -> f64 {
    let total: f64 = window
        .iter()
        .zip(needle.iter())
        .map(|(a, b)| line_similarity(a, b))
        .sum();
    total / needle.len() as f64
}

fn line_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        1.0
    } else {
        1.0 - (distance as f64 / max_len as f64)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 {
        return len_b;
    }
    if len_b == 0 {
        return len_a;
    }

    let mut prev: Vec<usize> = (0..=len_b).collect();
    let mut curr = vec![0usize; len_b + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[len_b]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<String> {
        s.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn finds_exact_window() {
        let source = lines("line 1\nline 2\nline 3");
        let needle = lines("line 2");
        let result = find_closest(&source, &needle).unwrap();
        assert_eq!(result.start_index, 1);
        assert_eq!(result.similarity, 1.0);
    }

    #[test]
    fn perfect_match_has_no_feedback_needed_distinction() {
        let source = lines("a\nb\nc");
        let needle = lines("b");
        let result = find_closest(&source, &needle).unwrap();
        assert!(result.similarity >= 1.0);
    }

    #[test]
    fn near_miss_scores_below_one() {
        let source = lines("if x.is_dir() {\n return true;\n}");
        let needle = lines("if x.is_dir() {\n return true");
        let result = find_closest(&source, &needle).unwrap();
        assert_eq!(result.start_index, 0);
        assert!(result.similarity > 0.9 && result.similarity < 1.0);
    }
}
