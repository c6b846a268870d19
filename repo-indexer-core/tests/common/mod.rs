#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use repo_indexer_core::config::{
    CrawlConfig, ExclusionConfig, FailurePolicy, HostingConfig, IndexTarget, RunConfig,
};
use repo_indexer_core::contract::{NodeKind, RepositoryDescriptor, TreeNode};
use std::path::Path;

pub const API: &str = "https://api.example.com";
pub const RAW: &str = "https://raw.example.com";

pub fn run_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap()
}

pub fn target() -> IndexTarget {
    IndexTarget {
        collection: "code".into(),
        api_key: "secret-key".into(),
    }
}

pub fn repo(owner: &str, name: &str) -> RepositoryDescriptor {
    RepositoryDescriptor {
        name: name.into(),
        contents_endpoint_template: format!("{API}/repos/{owner}/{name}/contents/{{+path}}"),
    }
}

pub fn contents_root(owner: &str, name: &str) -> String {
    format!("{API}/repos/{owner}/{name}/contents")
}

pub fn file(path: &str) -> TreeNode {
    let name = path.rsplit('/').next().unwrap_or(path);
    TreeNode {
        name: name.into(),
        path: path.into(),
        kind: NodeKind::File,
        download_locator: Some(format!("{RAW}/main/{path}")),
        metadata_locator: None,
    }
}

pub fn dir(path: &str) -> TreeNode {
    let name = path.rsplit('/').next().unwrap_or(path);
    TreeNode {
        name: name.into(),
        path: path.into(),
        kind: NodeKind::Directory,
        download_locator: None,
        metadata_locator: None,
    }
}

pub fn raw(path: &str) -> String {
    format!("{RAW}/main/{path}")
}

pub fn crawl_config(data_dir: &Path, extensions: &[&str], policy: FailurePolicy) -> CrawlConfig {
    CrawlConfig {
        hosting: HostingConfig {
            base_url: API.into(),
            public_repos: false,
            include_users: vec!["alice".into()],
            include_orgs: vec!["acme".into()],
        },
        exclude: ExclusionConfig {
            repos: vec!["legacy".into()],
            files: vec![],
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        },
        target: target(),
        data_dir: data_dir.to_path_buf(),
        run: RunConfig {
            settle_delay_secs: 0,
            probe_retries: 0,
            probe_spacing_secs: 0,
            on_repository_error: policy,
        },
    }
}
