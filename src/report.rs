use readymeta_model::{Metadata, Person, PersonIdentifier};

pub const EMPTY_SENTINEL: &str = "<empty>";
pub const OPEN_ACCESS: &str = "Open - freely retrievable";
pub const DIAGNOSTICS_HEADING: &str = "readYmeta diagnostics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Title,
    Description,
    Tags,
    Creators,
    Contributors,
    Disciplines,
    Collected,
    CoveredPeriod,
    FundingReferences,
    RelatedDatapackages,
    General,
    Diagnostics,
}

impl Section {
    /// Reading order of the report body. `Diagnostics` follows only when warnings were raised.
    pub const BODY: [Section; 11] = [
        Section::Title,
        Section::Description,
        Section::Tags,
        Section::Creators,
        Section::Contributors,
        Section::Disciplines,
        Section::Collected,
        Section::CoveredPeriod,
        Section::FundingReferences,
        Section::RelatedDatapackages,
        Section::General,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::Title => "title",
            Section::Description => "description",
            Section::Tags => "tags",
            Section::Creators => "creators",
            Section::Contributors => "contributors",
            Section::Disciplines => "disciplines",
            Section::Collected => "collected",
            Section::CoveredPeriod => "covered_period",
            Section::FundingReferences => "funding_references",
            Section::RelatedDatapackages => "related_datapackages",
            Section::General => "general",
            Section::Diagnostics => "diagnostics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Heading,
    LabelValue,
    LabelValuePair,
    ListItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Normal,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowContent {
    Text(String),
    Pair { label: String, value: String },
}

impl RowContent {
    pub fn text(&self) -> String {
        match self {
            RowContent::Text(text) => text.clone(),
            RowContent::Pair { label, value } => format!("{label}: {value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowHeight {
    Standard,
    /// Explicit height in millimetres.
    Tall(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowHint {
    pub height: RowHeight,
    pub tone: Tone,
}

impl Default for RowHint {
    fn default() -> Self {
        Self {
            height: RowHeight::Standard,
            tone: Tone::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub section: Section,
    pub depth: u8,
    pub kind: RowKind,
    pub content: RowContent,
    pub flagged: bool,
    pub emphasis: Emphasis,
    pub hint: RowHint,
}

impl ReportRow {
    fn new(section: Section, depth: u8, kind: RowKind, content: RowContent) -> Self {
        Self {
            section,
            depth,
            kind,
            content,
            flagged: false,
            emphasis: Emphasis::Normal,
            hint: RowHint::default(),
        }
    }

    fn flagged(mut self, flagged: bool) -> Self {
        self.flagged = flagged;
        self
    }

    fn with_hint(mut self, hint: RowHint) -> Self {
        self.hint = hint;
        self
    }
}

/// Running count of flagged rows for one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: usize,
}

impl Diagnostics {
    pub fn tally(&mut self, row: &ReportRow) {
        if row.flagged {
            self.warnings += 1;
        }
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Standard row height in millimetres.
    pub row_height_mm: f32,
    /// Characters per millimetre of description body height.
    pub description_divisor: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            row_height_mm: 4.0,
            description_divisor: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub warnings: usize,
}

impl Report {
    /// Distinct sections in the order they appear.
    pub fn sections(&self) -> Vec<Section> {
        let mut out: Vec<Section> = Vec::new();
        for row in &self.rows {
            if out.last() != Some(&row.section) {
                out.push(row.section);
            }
        }
        out
    }

    pub fn rows_in(&self, section: Section) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |row| row.section == section)
    }

    pub fn flagged_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|row| row.flagged)
    }
}

pub fn is_missing(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_missing_item(value: &str) -> bool {
    is_missing(value) || value == EMPTY_SENTINEL
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> (&'a str, bool) {
    if is_missing(value) {
        (placeholder, true)
    } else {
        (value, false)
    }
}

struct RowWriter {
    rows: Vec<ReportRow>,
    diagnostics: Diagnostics,
    section: Section,
}

impl RowWriter {
    fn push(&mut self, row: ReportRow) {
        self.diagnostics.tally(&row);
        self.rows.push(row);
    }

    fn heading(&mut self, label: &str) {
        let mut row = ReportRow::new(
            self.section,
            0,
            RowKind::Heading,
            RowContent::Text(label.to_string()),
        );
        row.emphasis = Emphasis::Bold;
        self.push(row);
    }

    fn value(&mut self, depth: u8, text: &str, flagged: bool) {
        let row = ReportRow::new(
            self.section,
            depth,
            RowKind::LabelValue,
            RowContent::Text(text.to_string()),
        )
        .flagged(flagged);
        self.push(row);
    }

    fn scalar(&mut self, value: &str) {
        let (text, flagged) = or_placeholder(value, EMPTY_SENTINEL);
        self.value(0, text, flagged);
    }

    fn labelled(&mut self, label: &str, value: &str) {
        self.heading(label);
        self.scalar(value);
    }

    fn item(&mut self, text: &str, flagged: bool) {
        let row = ReportRow::new(
            self.section,
            1,
            RowKind::ListItem,
            RowContent::Text(text.to_string()),
        )
        .flagged(flagged);
        self.push(row);
    }

    fn sentinel(&mut self) {
        self.item(EMPTY_SENTINEL, true);
    }

    fn list(&mut self, items: &[String]) {
        if items.is_empty() {
            self.sentinel();
            return;
        }
        for item in items {
            let flagged = is_missing_item(item);
            let text = if is_missing(item) { EMPTY_SENTINEL } else { item };
            self.item(text, flagged);
        }
    }

    fn pair(&mut self, label: &str, value: &str, flagged: bool) {
        let row = ReportRow::new(
            self.section,
            1,
            RowKind::LabelValuePair,
            RowContent::Pair {
                label: label.to_string(),
                value: value.to_string(),
            },
        )
        .flagged(flagged);
        self.push(row);
    }

    fn date_range(&mut self, start: &str, end: &str) {
        for (label, value) in [("StartDate", start), ("EndDate", end)] {
            let (text, flagged) = or_placeholder(value, EMPTY_SENTINEL);
            self.pair(label, text, flagged);
        }
    }

    fn identifier(&mut self, scheme: &str, identifier: &str) {
        let (scheme, scheme_missing) = or_placeholder(scheme, "IdentifierScheme");
        let (identifier, id_missing) = or_placeholder(identifier, "Identifier");
        self.value(
            1,
            &format!("({scheme}) {identifier}"),
            scheme_missing || id_missing,
        );
    }

    fn person(&mut self, person: &Person, contributor_type: Option<&str>) {
        let (given, given_missing) = or_placeholder(&person.name.given_name, "GivenName");
        let (family, family_missing) = or_placeholder(&person.name.family_name, "FamilyName");
        self.value(
            0,
            &format!("{given} {family}"),
            given_missing || family_missing,
        );
        if let Some(kind) = contributor_type {
            let (text, flagged) = or_placeholder(kind, "ContributorType");
            self.value(1, text, flagged);
        }
        if person.affiliation.is_empty() {
            self.item("Affiliation", true);
        }
        for affiliation in &person.affiliation {
            let (text, flagged) = or_placeholder(affiliation, "Affiliation");
            self.item(text, flagged);
        }
        for PersonIdentifier { scheme, identifier } in &person.person_identifier {
            self.identifier(scheme, identifier);
        }
    }
}

/// Walks `meta` in reading order and returns the report rows plus the warning count.
pub fn render(meta: &Metadata) -> Report {
    render_with(meta, &RenderOptions::default())
}

pub fn render_with(meta: &Metadata, options: &RenderOptions) -> Report {
    let mut writer = RowWriter {
        rows: Vec::new(),
        diagnostics: Diagnostics::default(),
        section: Section::Title,
    };

    for section in Section::BODY {
        writer.section = section;
        let before = writer.rows.len();
        render_section(&mut writer, section, meta, options);
        log::debug!(
            "section {}: {} rows, {} warnings so far",
            section.key(),
            writer.rows.len() - before,
            writer.diagnostics.warnings()
        );
    }

    let warnings = writer.diagnostics.warnings();
    let mut rows = writer.rows;
    if warnings > 0 {
        let mut heading = ReportRow::new(
            Section::Diagnostics,
            0,
            RowKind::Heading,
            RowContent::Text(DIAGNOSTICS_HEADING.to_string()),
        );
        heading.emphasis = Emphasis::Bold;
        rows.push(heading);
        rows.push(ReportRow::new(
            Section::Diagnostics,
            0,
            RowKind::LabelValue,
            RowContent::Text(diagnostics_message(warnings)),
        ));
    }
    Report { rows, warnings }
}

pub fn diagnostics_message(warnings: usize) -> String {
    format!(
        "{warnings} warnings were generated, please check for missing (optional) information."
    )
}

fn render_section(w: &mut RowWriter, section: Section, meta: &Metadata, options: &RenderOptions) {
    match section {
        Section::Title => w.labelled("Title", &meta.title),
        Section::Description => {
            w.heading("Description");
            let (text, flagged) = or_placeholder(&meta.description, EMPTY_SENTINEL);
            let row = ReportRow::new(
                section,
                0,
                RowKind::LabelValue,
                RowContent::Text(text.to_string()),
            )
            .flagged(flagged)
            .with_hint(description_hint(&meta.description, options));
            w.push(row);
        }
        Section::Tags => {
            w.heading("Tags");
            w.list(&meta.tag);
        }
        Section::Creators => {
            w.heading("Creators");
            if meta.creator.is_empty() {
                w.sentinel();
            }
            for creator in &meta.creator {
                w.person(creator, None);
            }
        }
        Section::Contributors => {
            w.heading("Contributors");
            if meta.contributor.is_empty() {
                w.sentinel();
            }
            for contributor in &meta.contributor {
                w.person(&contributor.person, Some(&contributor.contributor_type));
            }
        }
        Section::Disciplines => {
            w.heading("Disciplines");
            w.list(&meta.discipline);
        }
        Section::Collected => {
            w.heading("Collected");
            w.date_range(&meta.collected.start_date, &meta.collected.end_date);
        }
        Section::CoveredPeriod => {
            w.heading("Covered Period");
            w.date_range(&meta.covered_period.start_date, &meta.covered_period.end_date);
        }
        Section::FundingReferences => {
            w.heading("Funding references");
            if meta.funding_reference.is_empty() {
                w.sentinel();
            }
            for funding in &meta.funding_reference {
                let (funder, funder_missing) = or_placeholder(&funding.funder_name, EMPTY_SENTINEL);
                let (award, award_missing) = or_placeholder(&funding.award_number, EMPTY_SENTINEL);
                w.pair(funder, award, funder_missing || award_missing);
            }
        }
        Section::RelatedDatapackages => {
            w.heading("Related datapackages");
            if meta.related_datapackage.is_empty() {
                w.sentinel();
            }
            for related in &meta.related_datapackage {
                let (relation, flagged) = or_placeholder(&related.relation_type, "RelationType");
                w.value(0, relation, flagged);
                w.identifier(
                    &related.persistent_identifier.scheme,
                    &related.persistent_identifier.identifier,
                );
                let (title, flagged) = or_placeholder(&related.title, "Title");
                w.value(1, title, flagged);
            }
        }
        Section::General => {
            w.labelled("Dataset Version", &meta.version);
            w.labelled("Licence", &meta.license);
            w.labelled("Data Type", &meta.data_type);
            w.labelled("Data Classification", &meta.data_classification);

            w.heading("Data Access Restriction");
            let restriction = &meta.data_access_restriction;
            let (text, _) = or_placeholder(restriction, EMPTY_SENTINEL);
            w.value(0, text, restriction != OPEN_ACCESS);

            w.labelled("Language", &meta.language);
            w.heading("Retention Period");
            w.value(0, &format!("{} years", meta.retention_period), false);
            w.labelled("Retention Information", &meta.retention_information);
            w.labelled("Embargo EndDate", &meta.embargo_end_date);
            w.labelled("Remarks", &meta.remarks);
        }
        Section::Diagnostics => {}
    }
}

// Long descriptions get a body row tall enough for the prose; short ones are drawn
// in the attention tone because they are often truncated.
fn description_hint(description: &str, options: &RenderOptions) -> RowHint {
    let chars = description.chars().count() as f32;
    let divisor = if options.description_divisor > 0.0 {
        options.description_divisor
    } else {
        RenderOptions::default().description_divisor
    };
    let height = chars / divisor;
    if height > options.row_height_mm {
        RowHint {
            height: RowHeight::Tall(height),
            tone: Tone::Neutral,
        }
    } else {
        RowHint {
            height: RowHeight::Standard,
            tone: Tone::Attention,
        }
    }
}
