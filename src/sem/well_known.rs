//! Well-known library symbols.
//!
//! Rules never look members up by string at match time. Each symbol a rule
//! cares about has a stable [`WellKnown`] name resolved once per compilation
//! into an [`WellKnownSymbols`] table; a `None` entry means the member does
//! not exist under the active profile and every rule requiring it goes inert.

use super::types::{MemberId, Profile};

/// Stable names for the library members the rule catalog matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum WellKnown {
    DictContainsKey,
    DictRemove,
    SetContains,
    SetAdd,
    SetRemove,
    SeqAny,
    SeqCount,
    SpanFill,
    SpanClear,
    StringLength,
    StringIndexer,
    StringAsSpan,
    StringIndexOfString,
    StringIndexOfChar,
    StringIndexOfStringComparison,
    StringIndexOfCharComparison,
    StringIndexOfStringStart,
    StringIndexOfCharStart,
    StringStartsWithString,
    StringStartsWithStringComparison,
    StringStartsWithChar,
    StringEndsWithString,
    StringEndsWithStringComparison,
    StringEndsWithChar,
    StringContainsString,
    StringContainsChar,
    RoSpanStartsWithString,
}

const WELL_KNOWN_COUNT: usize = WellKnown::RoSpanStartsWithString as usize + 1;

/// Resolution results for every [`WellKnown`] name, fixed per compilation.
#[derive(Debug)]
pub struct WellKnownSymbols {
    entries: [Option<MemberId>; WELL_KNOWN_COUNT],
}

impl WellKnownSymbols {
    /// Resolve the full table against a profile.
    pub fn resolve(profile: Profile) -> Self {
        let modern = profile == Profile::Modern;
        let mut entries = [None; WELL_KNOWN_COUNT];
        let mut set = |name: WellKnown, member: MemberId| {
            entries[name as usize] = Some(member);
        };

        set(WellKnown::DictContainsKey, MemberId::DictContainsKey);
        set(WellKnown::DictRemove, MemberId::DictRemove);
        set(WellKnown::SetContains, MemberId::SetContains);
        set(WellKnown::SetAdd, MemberId::SetAdd);
        set(WellKnown::SetRemove, MemberId::SetRemove);
        set(WellKnown::SeqAny, MemberId::SeqAny);
        set(WellKnown::SeqCount, MemberId::SeqCount);
        set(WellKnown::StringLength, MemberId::StrLength);
        set(WellKnown::StringIndexer, MemberId::StrIndexer);
        set(WellKnown::StringIndexOfString, MemberId::StrIndexOfStr);
        set(WellKnown::StringIndexOfChar, MemberId::StrIndexOfChar);
        set(
            WellKnown::StringIndexOfStringComparison,
            MemberId::StrIndexOfStrCmp,
        );
        set(
            WellKnown::StringIndexOfStringStart,
            MemberId::StrIndexOfStrStart,
        );
        set(
            WellKnown::StringIndexOfCharStart,
            MemberId::StrIndexOfCharStart,
        );
        set(WellKnown::StringStartsWithString, MemberId::StrStartsWithStr);
        set(
            WellKnown::StringStartsWithStringComparison,
            MemberId::StrStartsWithStrCmp,
        );
        set(WellKnown::StringEndsWithString, MemberId::StrEndsWithStr);
        set(
            WellKnown::StringEndsWithStringComparison,
            MemberId::StrEndsWithStrCmp,
        );
        set(WellKnown::StringContainsString, MemberId::StrContainsStr);

        if modern {
            set(WellKnown::SpanFill, MemberId::SpanFill);
            set(WellKnown::SpanClear, MemberId::SpanClear);
            set(WellKnown::StringAsSpan, MemberId::StrAsSpan);
            set(
                WellKnown::StringIndexOfCharComparison,
                MemberId::StrIndexOfCharCmp,
            );
            set(WellKnown::StringStartsWithChar, MemberId::StrStartsWithChar);
            set(WellKnown::StringEndsWithChar, MemberId::StrEndsWithChar);
            set(WellKnown::StringContainsChar, MemberId::StrContainsChar);
            set(
                WellKnown::RoSpanStartsWithString,
                MemberId::RoSpanStartsWithStr,
            );
        }

        WellKnownSymbols { entries }
    }

    /// `None` when the member is absent under the resolved profile.
    pub fn get(&self, name: WellKnown) -> Option<MemberId> {
        self.entries[name as usize]
    }
}
