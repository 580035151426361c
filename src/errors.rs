use error_chain::error_chain;

error_chain! {
    foreign_links {
        Io(std::io::Error);
        HttpRequest(reqwest::Error);
        Url(url::ParseError);
        Csv(csv::Error);
        Parquet(parquet::errors::ParquetError);
        Xlsx(rust_xlsxwriter::XlsxError);
        Join(tokio::task::JoinError);
    }

    errors {
        InvalidSelector(selector: String, reason: String) {
            description("invalid CSS selector")
            display("invalid CSS selector '{}': {}", selector, reason)
        }

        MalformedCard(page: String, missing: &'static str) {
            description("content card is missing a required element")
            display("content card on {} has no {}", page, missing)
        }

        UnknownFormat(name: String) {
            description("unknown output format")
            display("unknown output format '{}' (expected csv, parquet or xlsx)", name)
        }
    }
}
