#![forbid(unsafe_code)]

//! User-agent quirk detection.
//!
//! Pure string predicates, separated from the DOM plumbing so they compile
//! and test on every target. The adapter feeds them the live
//! `navigator.userAgent`.

/// The Android 2.x / 4.0 stock browser claims `pushState` support but
/// corrupts the stack when it is used. Chrome and Windows Phone builds that
/// embed the same token are fine.
#[must_use]
pub fn is_broken_stock_android(user_agent: &str) -> bool {
    (user_agent.contains("Android 2.") || user_agent.contains("Android 4.0"))
        && user_agent.contains("Mobile Safari")
        && !user_agent.contains("Chrome")
        && !user_agent.contains("Windows Phone")
}

/// Trident (IE 11) does not fire `popstate` on hash changes, so the adapter
/// must listen for `hashchange` as well.
#[must_use]
pub fn needs_hash_change_events(user_agent: &str) -> bool {
    user_agent.contains("Trident")
}

/// WebKit fires a spurious `popstate` with `undefined` state on page load;
/// Chrome on iOS is exempt from the workaround.
#[must_use]
pub fn is_extraneous_popstate(user_agent: &str, state_is_undefined: bool) -> bool {
    state_is_undefined && !user_agent.contains("CriOS")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_ANDROID_40: &str = "Mozilla/5.0 (Linux; U; Android 4.0.3; en-us; GT-I9100 Build/IML74K) \
         AppleWebKit/534.30 (KHTML, like Gecko) Version/4.0 Mobile Safari/534.30";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 4.0.4; Galaxy Nexus Build/IMM76B) \
         AppleWebKit/535.19 (KHTML, like Gecko) Chrome/18.0.1025.133 Mobile Safari/535.19";
    const IE11: &str =
        "Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; rv:11.0) like Gecko";
    const CHROME_IOS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 10_3 like Mac OS X) \
         AppleWebKit/602.1.50 (KHTML, like Gecko) CriOS/56.0.2924.75 Mobile/14E5239e Safari/602.1";
    const DESKTOP_SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Safari/605.1.15";

    #[test]
    fn stock_android_is_flagged() {
        assert!(is_broken_stock_android(STOCK_ANDROID_40));
    }

    #[test]
    fn chrome_on_android_is_not_flagged() {
        assert!(!is_broken_stock_android(CHROME_ANDROID));
    }

    #[test]
    fn modern_browsers_are_not_flagged() {
        assert!(!is_broken_stock_android(DESKTOP_SAFARI));
        assert!(!is_broken_stock_android(IE11));
    }

    #[test]
    fn only_trident_needs_hash_change_events() {
        assert!(needs_hash_change_events(IE11));
        assert!(!needs_hash_change_events(DESKTOP_SAFARI));
        assert!(!needs_hash_change_events(CHROME_ANDROID));
    }

    #[test]
    fn undefined_state_is_extraneous_except_on_chrome_ios() {
        assert!(is_extraneous_popstate(DESKTOP_SAFARI, true));
        assert!(!is_extraneous_popstate(CHROME_IOS, true));
        assert!(!is_extraneous_popstate(DESKTOP_SAFARI, false));
    }
}
