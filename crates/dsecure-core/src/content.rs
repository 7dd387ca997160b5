//! Static article catalog.
//!
//! The site's blog posts are fixed content compiled into the binary. Each
//! article's slug doubles as its reaction item id.

use serde::Serialize;

/// One blog article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Article {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    /// ISO-8601 publication date (`YYYY-MM-DD`).
    pub published: &'static str,
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    pub paragraphs: &'static [&'static str],
}

/// An entry on the news listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewsEntry {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub published: &'static str,
    pub category: &'static str,
}

impl Article {
    /// Site path of the article page.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/blog/{}", self.slug)
    }
}

impl From<&Article> for NewsEntry {
    fn from(a: &Article) -> Self {
        Self {
            slug: a.slug,
            title: a.title,
            summary: a.summary,
            published: a.published,
            category: a.category,
        }
    }
}

const ARTICLES: &[Article] = &[
    Article {
        slug: "nist-800-88-explained",
        title: "NIST 800-88 Explained: Clear, Purge, and Destroy",
        summary: "What the three sanitization levels in NIST SP 800-88 mean and when each one applies.",
        published: "2024-03-12",
        category: "Standards",
        keywords: &["NIST 800-88", "media sanitization", "data erasure"],
        paragraphs: &[
            "NIST Special Publication 800-88 is the reference most auditors reach for when they ask how a drive was sanitized. It groups every technique into three levels: Clear, Purge, and Destroy.",
            "Clear overwrites user-addressable storage and protects against simple recovery tools. Purge uses firmware-level commands such as Secure Erase or cryptographic erase and defeats laboratory recovery. Destroy leaves the media physically unusable.",
            "D-Secure maps each erasure method to the level it satisfies and records that mapping in the tamper-proof certificate issued for every drive.",
        ],
    },
    Article {
        slug: "erasing-ssds-safely",
        title: "Erasing SSDs Safely: Why Overwriting Is Not Enough",
        summary: "Wear levelling and over-provisioning hide data from overwrite passes. Firmware commands reach it.",
        published: "2024-05-02",
        category: "Technology",
        keywords: &["SSD erasure", "secure erase", "NVMe sanitize"],
        paragraphs: &[
            "Solid-state drives remap writes across their flash cells. An overwrite pass only touches the blocks the controller chooses to expose, leaving retired and over-provisioned blocks untouched.",
            "ATA Secure Erase, NVMe Sanitize, and cryptographic erase instruct the controller itself to reset every cell or discard the media encryption key.",
            "D-Secure detects the drive interface, issues the strongest supported command, and verifies the result before generating a report.",
        ],
    },
    Article {
        slug: "itad-chain-of-custody",
        title: "Chain of Custody in IT Asset Disposition",
        summary: "How ITAD providers prove that every asset was tracked from pickup to final erasure.",
        published: "2024-07-18",
        category: "ITAD",
        keywords: &["ITAD", "chain of custody", "asset tracking"],
        paragraphs: &[
            "An IT asset disposition project is only as trustworthy as its paperwork. Every device should be logged at pickup, on arrival, during erasure, and at resale or recycling.",
            "Serial numbers captured by the erasure software tie each certificate back to the asset list, closing the gaps that manual spreadsheets leave open.",
        ],
    },
    Article {
        slug: "gdpr-right-to-erasure",
        title: "GDPR and the Right to Erasure on Retired Hardware",
        summary: "Article 17 obligations do not end when a laptop leaves the building.",
        published: "2024-09-05",
        category: "Compliance",
        keywords: &["GDPR", "right to erasure", "data protection"],
        paragraphs: &[
            "Personal data stored on retired laptops, servers, and phones remains within scope of the GDPR until it is irrecoverably erased.",
            "Regulators expect controllers to show how erasure was performed. A per-device certificate with the method, result, and operator is the simplest evidence to hand over.",
            "Physical destruction satisfies the requirement but removes resale value. Verified software erasure keeps the hardware in circulation.",
        ],
    },
    Article {
        slug: "degaussing-vs-software-erasure",
        title: "Degaussing vs Software Erasure",
        summary: "Degaussers wipe magnetic media but do nothing for flash, and they destroy the drive.",
        published: "2024-11-21",
        category: "Technology",
        keywords: &["degaussing", "HDD erasure", "sustainability"],
        paragraphs: &[
            "A degausser scrambles the magnetic domains on a hard disk platter. The drive is unusable afterwards, and the process has no effect on SSDs or flash cards.",
            "Software erasure leaves the drive working, produces a verifiable report, and handles both magnetic and flash media.",
        ],
    },
];

/// All articles, newest first.
#[must_use]
pub fn articles() -> Vec<&'static Article> {
    let mut all: Vec<&'static Article> = ARTICLES.iter().collect();
    all.sort_by(|a, b| b.published.cmp(a.published));
    all
}

/// Look up an article by slug.
#[must_use]
pub fn find(slug: &str) -> Option<&'static Article> {
    ARTICLES.iter().find(|a| a.slug == slug)
}

/// Entries for the news listing page, newest first.
#[must_use]
pub fn news() -> Vec<NewsEntry> {
    articles().into_iter().map(NewsEntry::from).collect()
}
