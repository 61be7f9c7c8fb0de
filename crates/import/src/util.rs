/// Upper-cases the first letter of every word and lower-cases the rest.
///
/// A word starts after any non-alphabetic character, so `CHICK-FIL-A` becomes
/// `Chick-Fil-A` and `FREDDY'S` becomes `Freddy'S`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
