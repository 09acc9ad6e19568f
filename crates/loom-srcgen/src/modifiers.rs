use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Declaration modifiers as a bit set.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const PUBLIC: Modifiers = Modifiers(1 << 0);
    pub const PROTECTED: Modifiers = Modifiers(1 << 1);
    pub const PRIVATE: Modifiers = Modifiers(1 << 2);
    pub const ABSTRACT: Modifiers = Modifiers(1 << 3);
    pub const DEFAULT: Modifiers = Modifiers(1 << 4);
    pub const STATIC: Modifiers = Modifiers(1 << 5);
    pub const FINAL: Modifiers = Modifiers(1 << 6);
    pub const TRANSIENT: Modifiers = Modifiers(1 << 7);
    pub const VOLATILE: Modifiers = Modifiers(1 << 8);
    pub const SYNCHRONIZED: Modifiers = Modifiers(1 << 9);
    pub const NATIVE: Modifiers = Modifiers(1 << 10);

    const KEYWORDS: [(Modifiers, &'static str); 11] = [
        (Modifiers::PUBLIC, "public"),
        (Modifiers::PROTECTED, "protected"),
        (Modifiers::PRIVATE, "private"),
        (Modifiers::ABSTRACT, "abstract"),
        (Modifiers::DEFAULT, "default"),
        (Modifiers::STATIC, "static"),
        (Modifiers::FINAL, "final"),
        (Modifiers::TRANSIENT, "transient"),
        (Modifiers::VOLATILE, "volatile"),
        (Modifiers::SYNCHRONIZED, "synchronized"),
        (Modifiers::NATIVE, "native"),
    ];

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Appends each keyword followed by a space, in canonical order.
    pub(crate) fn render(self, out: &mut String) {
        for (flag, keyword) in Self::KEYWORDS {
            if self.contains(flag) {
                out.push_str(keyword);
                out.push(' ');
            }
        }
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out);
        write!(f, "Modifiers({})", out.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_canonical_order() {
        let mut out = String::new();
        (Modifiers::FINAL | Modifiers::STATIC | Modifiers::PUBLIC).render(&mut out);
        assert_eq!(out, "public static final ");
        assert!((Modifiers::PUBLIC | Modifiers::STATIC).contains(Modifiers::STATIC));
        assert_eq!(
            (Modifiers::PUBLIC | Modifiers::FINAL).without(Modifiers::FINAL),
            Modifiers::PUBLIC
        );
    }
}
