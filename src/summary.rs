use readymeta_model::Metadata;
use std::fmt::Write;

/// Markdown digest of the identifying fields. Values are copied as-is; nothing is flagged.
pub fn to_markdown(meta: &Metadata, source_name: &str) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_markdown(&mut out, meta, source_name);
    out
}

fn write_markdown(out: &mut String, meta: &Metadata, source_name: &str) -> std::fmt::Result {
    writeln!(out, "# \"{source_name}\" metadata")?;

    writeln!(out, "\n## Identification")?;
    writeln!(out, "- Title: {}", meta.title)?;
    writeln!(
        out,
        "- CollectionDate: {} to {}",
        meta.collected.start_date, meta.collected.end_date
    )?;
    writeln!(out, "- ResourceType: {}", meta.data_type)?;
    writeln!(out, "- Rights: {}", meta.license)?;
    writeln!(out, "- Version: {}", meta.version)?;

    writeln!(out, "\n## Creator")?;
    for creator in &meta.creator {
        write!(
            out,
            "- Creator: {} {} ",
            creator.name.given_name, creator.name.family_name
        )?;
        for id in &creator.person_identifier {
            write!(out, "({}: {}) ", id.scheme, id.identifier)?;
        }
        out.push('\n');
        for affiliation in &creator.affiliation {
            writeln!(out, "- CreatorAffiliation: {affiliation}")?;
        }
    }

    writeln!(out, "\n## Description")?;
    writeln!(out, "{}", meta.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use readymeta_model::{DateRange, Person, PersonIdentifier, PersonName};

    #[test]
    fn markdown_lists_identification_creators_and_description() {
        let meta = Metadata {
            title: "Soil moisture".to_string(),
            description: "Hourly readings.".to_string(),
            data_type: "Dataset".to_string(),
            license: "CC-BY-4.0".to_string(),
            version: "1.0".to_string(),
            collected: DateRange {
                start_date: "2021-03-01".to_string(),
                end_date: "2021-09-30".to_string(),
            },
            creator: vec![Person {
                name: PersonName {
                    given_name: "Ada".to_string(),
                    family_name: "Vermeer".to_string(),
                },
                affiliation: vec!["VU".to_string(), "UU".to_string()],
                person_identifier: vec![PersonIdentifier {
                    scheme: "ORCID".to_string(),
                    identifier: "0000-0002".to_string(),
                }],
            }],
            ..Metadata::default()
        };
        let expected = "# \"meta.json\" metadata\n\
                        \n## Identification\n\
                        - Title: Soil moisture\n\
                        - CollectionDate: 2021-03-01 to 2021-09-30\n\
                        - ResourceType: Dataset\n\
                        - Rights: CC-BY-4.0\n\
                        - Version: 1.0\n\
                        \n## Creator\n\
                        - Creator: Ada Vermeer (ORCID: 0000-0002) \n\
                        - CreatorAffiliation: VU\n\
                        - CreatorAffiliation: UU\n\
                        \n## Description\n\
                        Hourly readings.\n";
        assert_eq!(to_markdown(&meta, "meta.json"), expected);
    }

    #[test]
    fn empty_model_keeps_every_heading() {
        let markdown = to_markdown(&Metadata::default(), "yoda-metadata.json");
        assert!(markdown.starts_with("# \"yoda-metadata.json\" metadata\n"));
        assert!(markdown.contains("- CollectionDate:  to \n"));
        assert!(markdown.contains("\n## Creator\n\n## Description\n"));
        assert!(!markdown.contains("<empty>"));
    }
}
