/// Like `str::split` but for byte slices and a multi-element pattern.
pub fn split_pattern<'a, 'b, T>(me: &'a [T], pattern: &'b [T]) -> SplitPattern<'a, 'b, T> {
    SplitPattern::new(me, pattern)
}

pub struct SplitPattern<'a, 'b, T> {
    s: Option<&'a [T]>,
    p: &'b [T],
}

impl<'a, 'b, T> SplitPattern<'a, 'b, T> {
    fn new(s: &'a [T], p: &'b [T]) -> Self {
        Self { s: Some(s), p }
    }
}

impl<'a, 'b, T: PartialEq> Iterator for SplitPattern<'a, 'b, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        let s = self.s.take()?;

        let Some(pos) = position_pattern(s, self.p) else {
            return Some(s);
        };

        self.s.replace(&s[pos + self.p.len()..]);
        Some(&s[..pos])
    }
}

/// Like `str::split_once` but for slices.
pub fn split_once<'a, T: PartialEq>(me: &'a [T], pattern: &[T]) -> Option<(&'a [T], &'a [T])> {
    let pos = position_pattern(me, pattern)?;
    Some((&me[..pos], &me[pos + pattern.len()..]))
}

/// Like `str::strip_prefix` and `str::strip_suffix` combined; missing
/// affixes are ignored.
pub fn trim_affixes<'a, T: PartialEq>(me: &'a [T], prefix: &[T], suffix: &[T]) -> &'a [T] {
    let me = me.strip_prefix(prefix).unwrap_or(me);
    me.strip_suffix(suffix).unwrap_or(me)
}

/// Like `Iterator::position` but takes a pattern.
///
/// # Returns
///
/// An index up to but excluding pattern.
fn position_pattern<T: PartialEq>(me: &[T], pattern: &[T]) -> Option<usize> {
    if pattern.is_empty() {
        return None;
    }
    me.windows(pattern.len())
        .position(|window| window == pattern)
}
