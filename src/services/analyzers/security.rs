use url::Url;

use crate::domain::{FetchedPage, ParsedPage, SecurityFinding, SecurityReport, Severity};

fn finding(
    check: &str,
    severity: Severity,
    message: &str,
    evidence: Option<String>,
) -> SecurityFinding {
    SecurityFinding {
        check: check.to_string(),
        severity,
        message: message.to_string(),
        evidence,
    }
}

/// Passive checks over response headers and page markup. Nothing is probed.
pub fn analyze_security(fetched: &FetchedPage, page: &ParsedPage) -> SecurityReport {
    let https = fetched.is_https();
    let mut findings = Vec::new();

    if !https {
        findings.push(finding(
            "https",
            Severity::High,
            "Page is not served over HTTPS",
            Some(fetched.final_url.to_string()),
        ));
    }

    header_findings(fetched, https, &mut findings);

    if https {
        mixed_content_findings(page, &mut findings);
    }
    form_findings(page, &mut findings);
    integrity_findings(&fetched.final_url, page, &mut findings);
    cookie_findings(fetched, https, &mut findings);

    let penalty: u32 = findings.iter().map(|f| f.severity.weight()).sum();
    let score = 100u32.saturating_sub(penalty) as u8;

    SecurityReport {
        https,
        score,
        findings,
    }
}

fn header_findings(fetched: &FetchedPage, https: bool, findings: &mut Vec<SecurityFinding>) {
    if https && fetched.header("strict-transport-security").is_none() {
        findings.push(finding(
            "hsts",
            Severity::Medium,
            "Strict-Transport-Security header is missing",
            None,
        ));
    }

    let csp = fetched.header("content-security-policy");
    if csp.is_none() {
        findings.push(finding(
            "csp",
            Severity::Medium,
            "Content-Security-Policy header is missing",
            None,
        ));
    }

    if !fetched
        .header("x-content-type-options")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("nosniff"))
    {
        findings.push(finding(
            "x_content_type_options",
            Severity::Low,
            "X-Content-Type-Options is not set to nosniff",
            fetched.header("x-content-type-options").map(str::to_string),
        ));
    }

    let frame_ancestors = csp.is_some_and(|v| v.to_ascii_lowercase().contains("frame-ancestors"));
    if !frame_ancestors && fetched.header("x-frame-options").is_none() {
        findings.push(finding(
            "x_frame_options",
            Severity::Low,
            "Neither X-Frame-Options nor CSP frame-ancestors restricts framing",
            None,
        ));
    }

    if fetched.header("referrer-policy").is_none() {
        findings.push(finding(
            "referrer_policy",
            Severity::Low,
            "Referrer-Policy header is missing",
            None,
        ));
    }

    for name in ["server", "x-powered-by"] {
        if let Some(value) = fetched.header(name).filter(|v| discloses_version(v)) {
            findings.push(finding(
                "version_disclosure",
                Severity::Low,
                "Response header discloses a software version",
                Some(format!("{}: {}", name, value)),
            ));
        }
    }
}

fn discloses_version(value: &str) -> bool {
    value
        .split(['/', ' '])
        .skip(1)
        .any(|part| part.chars().next().is_some_and(|c| c.is_ascii_digit()))
}

fn mixed_content_findings(page: &ParsedPage, findings: &mut Vec<SecurityFinding>) {
    let insecure = |url: &&str| url.starts_with("http://");

    let active: Vec<&str> = page
        .scripts
        .iter()
        .map(|s| s.src.as_str())
        .chain(page.stylesheets.iter().map(String::as_str))
        .filter(insecure)
        .collect();
    if !active.is_empty() {
        findings.push(finding(
            "mixed_content_active",
            Severity::High,
            "Scripts or stylesheets are loaded over HTTP on an HTTPS page",
            Some(active.join(", ")),
        ));
    }

    let passive: Vec<&str> = page
        .images
        .iter()
        .map(|i| i.src.as_str())
        .filter(insecure)
        .collect();
    if !passive.is_empty() {
        findings.push(finding(
            "mixed_content_passive",
            Severity::Low,
            "Images are loaded over HTTP on an HTTPS page",
            Some(passive.join(", ")),
        ));
    }
}

fn form_findings(page: &ParsedPage, findings: &mut Vec<SecurityFinding>) {
    for form in page.forms.iter().filter(|f| f.action.starts_with("http://")) {
        let (severity, message) = if form.has_password_field {
            (Severity::High, "Password form submits over HTTP")
        } else {
            (Severity::Medium, "Form submits over HTTP")
        };
        findings.push(finding(
            "insecure_form",
            severity,
            message,
            Some(form.action.clone()),
        ));
    }
}

fn integrity_findings(page_url: &Url, page: &ParsedPage, findings: &mut Vec<SecurityFinding>) {
    let missing: Vec<&str> = page
        .scripts
        .iter()
        .filter(|s| !s.has_integrity)
        .filter(|s| {
            Url::parse(&s.src)
                .map(|src| src.host_str() != page_url.host_str())
                .unwrap_or(false)
        })
        .map(|s| s.src.as_str())
        .collect();

    if !missing.is_empty() {
        findings.push(finding(
            "subresource_integrity",
            Severity::Low,
            "External scripts are loaded without an integrity attribute",
            Some(missing.join(", ")),
        ));
    }
}

fn cookie_findings(fetched: &FetchedPage, https: bool, findings: &mut Vec<SecurityFinding>) {
    for cookie in fetched.header_values("set-cookie") {
        let mut parts = cookie.split(';').map(str::trim);
        let name = parts
            .next()
            .and_then(|pair| pair.split('=').next())
            .unwrap_or_default()
            .to_string();
        let attributes: Vec<String> = parts.map(|p| p.to_ascii_lowercase()).collect();
        let has = |attr: &str| {
            attributes
                .iter()
                .any(|a| a == attr || a.starts_with(&format!("{}=", attr)))
        };

        if https && !has("secure") {
            findings.push(finding(
                "cookie_secure",
                Severity::Medium,
                "Cookie is set without the Secure flag",
                Some(name.clone()),
            ));
        }
        if !has("httponly") {
            findings.push(finding(
                "cookie_httponly",
                Severity::Low,
                "Cookie is set without the HttpOnly flag",
                Some(name),
            ));
        }
    }
}
