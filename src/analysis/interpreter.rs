//! 模型回复解析器
//!
//! 把模型返回的分段文本解析为 [`AnalysisResult`]。模型的输出格式没有保证，
//! 因此解析分两轮进行：
//!
//! 1. 按标签切分：找到全部已知标签的位置，每个段落的内容截止到下一个标签；
//! 2. 当摘要为空，或者文本里有 `OBSERVATIONS:` 却没解析出任何观察项时，
//!    再按空行把文本切成段落逐段匹配，列表段落没有项目符号时退回到按行提取。
//!
//! 解析永远不会失败，没有匹配到的字段保持默认值。

use crate::models::AnalysisResult;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// 按段落解析时，无项目符号的行至少要有这么多字符才会被当作列表项
const MIN_PLAIN_ITEM_CHARS: usize = 10;

/// 回复中的段落
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    ConcernLevel,
    Summary,
    Observations,
    PossibleCauses,
    Recommendations,
    VeterinaryRecommendation,
}

impl Section {
    const ALL: [Section; 6] = [
        Section::ConcernLevel,
        Section::Summary,
        Section::Observations,
        Section::PossibleCauses,
        Section::Recommendations,
        Section::VeterinaryRecommendation,
    ];

    fn label(self) -> &'static str {
        match self {
            Section::ConcernLevel => "CONCERN_LEVEL:",
            Section::Summary => "SUMMARY:",
            Section::Observations => "OBSERVATIONS:",
            Section::PossibleCauses => "POSSIBLE_CAUSES:",
            Section::Recommendations => "RECOMMENDATIONS:",
            Section::VeterinaryRecommendation => "VETERINARY_RECOMMENDATION:",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.label() == label)
    }

    fn is_list(self) -> bool {
        matches!(
            self,
            Section::Observations | Section::PossibleCauses | Section::Recommendations
        )
    }
}

fn label_pattern() -> &'static Regex {
    static LABEL_PATTERN: OnceLock<Regex> = OnceLock::new();
    LABEL_PATTERN.get_or_init(|| {
        Regex::new(
            r"(CONCERN_LEVEL|SUMMARY|OBSERVATIONS|POSSIBLE_CAUSES|RECOMMENDATIONS|VETERINARY_RECOMMENDATION):",
        )
        .unwrap()
    })
}

fn blank_line_pattern() -> &'static Regex {
    static BLANK_LINE: OnceLock<Regex> = OnceLock::new();
    BLANK_LINE.get_or_init(|| Regex::new(r"\n[ \t]*\n").unwrap())
}

fn bullet_pattern() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| Regex::new(r"^[-•]\s*").unwrap())
}

/// 解析模型回复
pub fn parse_analysis(raw: &str) -> AnalysisResult {
    debug!("解析模型回复: {} 字符", raw.chars().count());

    let cleaned = clean_text(raw);
    let mut result = AnalysisResult::default();

    // 第一轮：按标签切分
    let mut seen: Vec<Section> = Vec::new();
    for (section, content) in split_by_labels(&cleaned) {
        // 同一标签重复出现时以第一次为准
        if seen.contains(&section) {
            continue;
        }
        seen.push(section);
        apply_section(&mut result, section, content, bullet_items(content));
    }

    // 第二轮：按空行分段
    if needs_paragraph_pass(&result, &cleaned) {
        info!("按标签解析不完整，改为按段落解析");
        let mut seen: Vec<Section> = Vec::new();
        for block in blank_line_pattern().split(&cleaned) {
            let block = block.trim();
            if !Section::ALL
                .into_iter()
                .any(|section| block.starts_with(section.label()))
            {
                continue;
            }

            // 段落内没有空行分隔的多个标签同样截止到下一个标签
            for (section, content) in split_by_labels(block) {
                if seen.contains(&section) {
                    continue;
                }
                seen.push(section);

                let mut items = bullet_items(content);
                if items.is_empty() {
                    items = plain_items(content);
                }
                apply_section(&mut result, section, content, items);
            }
        }
    }

    debug!(
        "解析结果: 等级={}, 观察 {} 项, 原因 {} 项, 建议 {} 项",
        result.concern_level,
        result.observations.len(),
        result.possible_causes.len(),
        result.recommendations.len()
    );
    result
}

/// 去掉强调标记并统一换行符
fn clean_text(raw: &str) -> String {
    raw.replace("**", "").replace("\r\n", "\n")
}

/// 按标签切分文本，返回 (段落, 内容)，内容截止到下一个标签或文本末尾
fn split_by_labels(text: &str) -> Vec<(Section, &str)> {
    let matches: Vec<_> = label_pattern().find_iter(text).collect();

    matches
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let section = Section::from_label(m.as_str())?;
            let end = matches.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
            Some((section, &text[m.end()..end]))
        })
        .collect()
}

fn needs_paragraph_pass(result: &AnalysisResult, cleaned: &str) -> bool {
    result.summary.is_empty()
        || (result.observations.is_empty()
            && cleaned.contains(Section::Observations.label()))
}

/// 以 `-` 或 `•` 开头的行
fn bullet_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-') || line.starts_with('•'))
        .map(|line| bullet_pattern().replace(line, "").trim().to_string())
        .collect()
}

/// 没有项目符号时，取较长的行
fn plain_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_PLAIN_ITEM_CHARS)
        .map(str::to_string)
        .collect()
}

/// 写入段落内容，空内容不覆盖已有值
fn apply_section(result: &mut AnalysisResult, section: Section, content: &str, items: Vec<String>) {
    if section.is_list() {
        if items.is_empty() {
            return;
        }
        match section {
            Section::Observations => result.observations = items,
            Section::PossibleCauses => result.possible_causes = items,
            _ => result.recommendations = items,
        }
        return;
    }

    let text = content.trim();
    if text.is_empty() {
        return;
    }
    match section {
        Section::ConcernLevel => result.concern_level = text.to_string(),
        Section::Summary => result.summary = text.to_string(),
        _ => result.veterinary_recommendation = text.to_string(),
    }
}
