//! Test outcomes: every result any evaluator can produce, with its wire
//! name, score modifier, and pass verdict.
//!
//! The modifier and pass tables are the single authority for scoring; the
//! golden report tests pin them.

use serde::{Serialize, Serializer};
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Every outcome in the battery's vocabulary.
///
/// Each test declares the subset it can produce; the wire name (kebab-case)
/// is what appears in reports, persisted overrides, and the API.
#[allow(missing_docs)] // the serialized wire names are the documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter, EnumString)]
pub enum Outcome {
    // content-security-policy
    #[strum(serialize = "csp-implemented-with-no-unsafe")]
    CspImplementedWithNoUnsafe,
    #[strum(serialize = "csp-implemented-with-unsafe-inline-in-style-src-only")]
    CspImplementedWithUnsafeInlineInStyleSrcOnly,
    #[strum(serialize = "csp-implemented-with-insecure-scheme-in-passive-content-only")]
    CspImplementedWithInsecureSchemeInPassiveContentOnly,
    #[strum(serialize = "csp-implemented-with-unsafe-eval")]
    CspImplementedWithUnsafeEval,
    #[strum(serialize = "csp-implemented-with-unsafe-inline")]
    CspImplementedWithUnsafeInline,
    #[strum(serialize = "csp-implemented-with-insecure-scheme")]
    CspImplementedWithInsecureScheme,
    #[strum(serialize = "csp-implemented-but-no-default-src-or-script-src")]
    CspImplementedButNoDefaultSrcOrScriptSrc,
    #[strum(serialize = "csp-not-implemented")]
    CspNotImplemented,
    #[strum(serialize = "csp-header-invalid")]
    CspHeaderInvalid,

    // cookies
    #[strum(serialize = "cookies-secure-with-httponly-sessions")]
    CookiesSecureWithHttponlySessions,
    #[strum(serialize = "cookies-not-found")]
    CookiesNotFound,
    #[strum(serialize = "cookies-without-samesite-flag")]
    CookiesWithoutSamesiteFlag,
    #[strum(serialize = "cookies-samesite-flag-invalid")]
    CookiesSamesiteFlagInvalid,
    #[strum(serialize = "cookies-without-secure-flag")]
    CookiesWithoutSecureFlag,
    #[strum(serialize = "cookies-session-without-httponly-flag")]
    CookiesSessionWithoutHttponlyFlag,

    // cross-origin-resource-sharing
    #[strum(serialize = "cross-origin-resource-sharing-not-implemented")]
    CorsNotImplemented,
    #[strum(serialize = "cross-origin-resource-sharing-implemented-with-public-access")]
    CorsImplementedWithPublicAccess,
    #[strum(serialize = "cross-origin-resource-sharing-implemented-with-restricted-access")]
    CorsImplementedWithRestrictedAccess,
    #[strum(serialize = "cross-origin-resource-sharing-implemented-with-universal-access")]
    CorsImplementedWithUniversalAccess,
    #[strum(serialize = "xml-not-parsable")]
    XmlNotParsable,

    // referrer-policy
    #[strum(serialize = "referrer-policy-private")]
    ReferrerPolicyPrivate,
    #[strum(serialize = "referrer-policy-no-referrer-when-downgrade")]
    ReferrerPolicyNoReferrerWhenDowngrade,
    #[strum(serialize = "referrer-policy-not-implemented")]
    ReferrerPolicyNotImplemented,
    #[strum(serialize = "referrer-policy-unsafe")]
    ReferrerPolicyUnsafe,
    #[strum(serialize = "referrer-policy-header-invalid")]
    ReferrerPolicyHeaderInvalid,

    // strict-transport-security
    #[strum(serialize = "hsts-preloaded")]
    HstsPreloaded,
    #[strum(serialize = "hsts-implemented-max-age-at-least-six-months")]
    HstsImplementedMaxAgeAtLeastSixMonths,
    #[strum(serialize = "hsts-implemented-max-age-less-than-six-months")]
    HstsImplementedMaxAgeLessThanSixMonths,
    #[strum(serialize = "hsts-not-implemented")]
    HstsNotImplemented,
    #[strum(serialize = "hsts-header-invalid")]
    HstsHeaderInvalid,
    #[strum(serialize = "hsts-not-implemented-no-https")]
    HstsNotImplementedNoHttps,

    // subresource-integrity
    #[strum(serialize = "sri-implemented-and-all-scripts-loaded-securely")]
    SriImplementedAndAllScriptsLoadedSecurely,
    #[strum(serialize = "sri-implemented-and-external-scripts-loaded-securely")]
    SriImplementedAndExternalScriptsLoadedSecurely,
    #[strum(serialize = "sri-not-implemented-response-not-html")]
    SriNotImplementedResponseNotHtml,
    #[strum(serialize = "sri-not-implemented-but-no-scripts-loaded")]
    SriNotImplementedButNoScriptsLoaded,
    #[strum(serialize = "sri-not-implemented-but-all-scripts-loaded-from-secure-origin")]
    SriNotImplementedButAllScriptsLoadedFromSecureOrigin,
    #[strum(serialize = "sri-not-implemented-but-external-scripts-loaded-securely")]
    SriNotImplementedButExternalScriptsLoadedSecurely,
    #[strum(serialize = "sri-implemented-but-external-scripts-not-loaded-securely")]
    SriImplementedButExternalScriptsNotLoadedSecurely,
    #[strum(serialize = "sri-not-implemented-and-external-scripts-not-loaded-securely")]
    SriNotImplementedAndExternalScriptsNotLoadedSecurely,

    // x-content-type-options
    #[strum(serialize = "x-content-type-options-nosniff")]
    XContentTypeOptionsNosniff,
    #[strum(serialize = "x-content-type-options-not-implemented")]
    XContentTypeOptionsNotImplemented,
    #[strum(serialize = "x-content-type-options-header-invalid")]
    XContentTypeOptionsHeaderInvalid,

    // x-frame-options
    #[strum(serialize = "x-frame-options-implemented-via-csp")]
    XFrameOptionsImplementedViaCsp,
    #[strum(serialize = "x-frame-options-sameorigin-or-deny")]
    XFrameOptionsSameoriginOrDeny,
    #[strum(serialize = "x-frame-options-allow-from-origin")]
    XFrameOptionsAllowFromOrigin,
    #[strum(serialize = "x-frame-options-not-implemented")]
    XFrameOptionsNotImplemented,
    #[strum(serialize = "x-frame-options-header-invalid")]
    XFrameOptionsHeaderInvalid,

    // redirection
    #[strum(serialize = "redirection-all-redirects-preloaded")]
    RedirectionAllRedirectsPreloaded,
    #[strum(serialize = "redirection-to-https")]
    RedirectionToHttps,
    #[strum(serialize = "redirection-not-needed-no-http")]
    RedirectionNotNeededNoHttp,
    #[strum(serialize = "redirection-off-host-from-http")]
    RedirectionOffHostFromHttp,
    #[strum(serialize = "redirection-not-to-https-on-initial-redirection")]
    RedirectionNotToHttpsOnInitialRedirection,
    #[strum(serialize = "redirection-not-to-https")]
    RedirectionNotToHttps,

    // cross-origin-resource-policy
    #[strum(serialize = "cross-origin-resource-policy-not-implemented")]
    CorpNotImplemented,
    #[strum(serialize = "cross-origin-resource-policy-implemented-with-same-origin")]
    CorpImplementedWithSameOrigin,
    #[strum(serialize = "cross-origin-resource-policy-implemented-with-same-site")]
    CorpImplementedWithSameSite,
    #[strum(serialize = "cross-origin-resource-policy-implemented-with-cross-origin")]
    CorpImplementedWithCrossOrigin,
    #[strum(serialize = "cross-origin-resource-policy-header-invalid")]
    CorpHeaderInvalid,
}

impl Outcome {
    /// Score modifier applied when a test produces this outcome.
    ///
    /// Only a strong CSP earns a bonus; everything else is zero or a
    /// penalty. The aggregate is clamped into [0, 135] by the grader.
    pub fn score_modifier(self) -> i32 {
        use Outcome::*;
        match self {
            CspImplementedWithNoUnsafe => 5,
            CspImplementedWithUnsafeInlineInStyleSrcOnly => 0,
            CspImplementedWithInsecureSchemeInPassiveContentOnly => -10,
            CspImplementedWithUnsafeEval => -10,
            CspImplementedWithUnsafeInline => -20,
            CspImplementedWithInsecureScheme => -20,
            CspImplementedButNoDefaultSrcOrScriptSrc => -25,
            CspNotImplemented => -25,
            CspHeaderInvalid => -25,

            CookiesSecureWithHttponlySessions => 0,
            CookiesNotFound => 0,
            CookiesWithoutSamesiteFlag => -5,
            CookiesSamesiteFlagInvalid => -10,
            CookiesWithoutSecureFlag => -20,
            CookiesSessionWithoutHttponlyFlag => -30,

            CorsNotImplemented => 0,
            CorsImplementedWithPublicAccess => 0,
            CorsImplementedWithRestrictedAccess => 0,
            CorsImplementedWithUniversalAccess => -50,
            XmlNotParsable => -20,

            ReferrerPolicyPrivate => 0,
            ReferrerPolicyNoReferrerWhenDowngrade => 0,
            ReferrerPolicyNotImplemented => 0,
            ReferrerPolicyUnsafe => -5,
            ReferrerPolicyHeaderInvalid => -5,

            HstsPreloaded => 0,
            HstsImplementedMaxAgeAtLeastSixMonths => 0,
            HstsImplementedMaxAgeLessThanSixMonths => -10,
            HstsNotImplemented => -20,
            HstsHeaderInvalid => -20,
            HstsNotImplementedNoHttps => -20,

            SriImplementedAndAllScriptsLoadedSecurely => 0,
            SriImplementedAndExternalScriptsLoadedSecurely => 0,
            SriNotImplementedResponseNotHtml => 0,
            SriNotImplementedButNoScriptsLoaded => 0,
            SriNotImplementedButAllScriptsLoadedFromSecureOrigin => 0,
            SriNotImplementedButExternalScriptsLoadedSecurely => -5,
            SriImplementedButExternalScriptsNotLoadedSecurely => -20,
            SriNotImplementedAndExternalScriptsNotLoadedSecurely => -50,

            XContentTypeOptionsNosniff => 0,
            XContentTypeOptionsNotImplemented => -5,
            XContentTypeOptionsHeaderInvalid => -5,

            XFrameOptionsImplementedViaCsp => 0,
            XFrameOptionsSameoriginOrDeny => 0,
            XFrameOptionsAllowFromOrigin => 0,
            XFrameOptionsNotImplemented => -20,
            XFrameOptionsHeaderInvalid => -20,

            RedirectionAllRedirectsPreloaded => 0,
            RedirectionToHttps => 0,
            RedirectionNotNeededNoHttp => 0,
            RedirectionOffHostFromHttp => -5,
            RedirectionNotToHttpsOnInitialRedirection => -10,
            RedirectionNotToHttps => -20,

            CorpNotImplemented => 0,
            CorpImplementedWithSameOrigin => 0,
            CorpImplementedWithSameSite => 0,
            CorpImplementedWithCrossOrigin => 0,
            CorpHeaderInvalid => -5,
        }
    }

    /// Whether this outcome counts as passing under the test's default
    /// expectation.
    pub fn passes(self) -> bool {
        use Outcome::*;
        matches!(
            self,
            CspImplementedWithNoUnsafe
                | CspImplementedWithUnsafeInlineInStyleSrcOnly
                | CookiesSecureWithHttponlySessions
                | CookiesNotFound
                | CorsNotImplemented
                | CorsImplementedWithPublicAccess
                | CorsImplementedWithRestrictedAccess
                | ReferrerPolicyPrivate
                | ReferrerPolicyNoReferrerWhenDowngrade
                | ReferrerPolicyNotImplemented
                | HstsPreloaded
                | HstsImplementedMaxAgeAtLeastSixMonths
                | SriImplementedAndAllScriptsLoadedSecurely
                | SriImplementedAndExternalScriptsLoadedSecurely
                | SriNotImplementedResponseNotHtml
                | SriNotImplementedButNoScriptsLoaded
                | SriNotImplementedButAllScriptsLoadedFromSecureOrigin
                | XContentTypeOptionsNosniff
                | XFrameOptionsImplementedViaCsp
                | XFrameOptionsSameoriginOrDeny
                | XFrameOptionsAllowFromOrigin
                | RedirectionAllRedirectsPreloaded
                | RedirectionToHttps
                | RedirectionNotNeededNoHttp
                | CorpNotImplemented
                | CorpImplementedWithSameOrigin
                | CorpImplementedWithSameSite
                | CorpImplementedWithCrossOrigin
        )
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
