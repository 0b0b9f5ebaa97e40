use crate::config::OutputFormat;
use crate::error::Result;
use crate::filter::ExclusionReason;
use crate::metadata::FileRecord;
use crate::profile::ProjectProfile;
use quick_xml::escape::escape;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ignored,
    Excluded(ExclusionReason),
    AccessError,
    ConversionFailed,
    ProcessingFailed,
    TokenLimit,
    // FIFO, socket or device node; never opened.
    NotRegularFile,
    PermissionDenied,
    DirectoryError,
}

#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub name: &'a str,
    pub rel_path: &'a str,
    pub depth: usize,
    pub size: Option<u64>,
}

pub trait OutputStrategy {
    fn begin(&mut self, profile: &ProjectProfile) -> Result<()>;
    fn enter_dir(&mut self, entry: Entry<'_>) -> Result<()>;
    fn file_entry(&mut self, record: &FileRecord, depth: usize) -> Result<()>;
    fn marker(&mut self, entry: Entry<'_>, marker: Marker) -> Result<()>;
    fn leave_dir(&mut self, entry: Entry<'_>) -> Result<()>;
    fn end(&mut self) -> Result<()>;
}

pub fn renderer_for<'w, W: Write + 'w>(
    format: OutputFormat,
    writer: W,
    generated: Option<String>,
) -> Box<dyn OutputStrategy + 'w> {
    match format {
        OutputFormat::Tree => Box::new(TreeRenderer::new(writer)),
        OutputFormat::Structured => {
            Box::new(StructuredRenderer::new(writer).with_generated(generated))
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

pub struct TreeRenderer<W: Write> {
    out: W,
}

impl<W: Write> TreeRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputStrategy for TreeRenderer<W> {
    fn begin(&mut self, _profile: &ProjectProfile) -> Result<()> {
        Ok(())
    }

    fn enter_dir(&mut self, entry: Entry<'_>) -> Result<()> {
        writeln!(self.out, "{}└── {}/", indent(entry.depth), entry.name)?;
        Ok(())
    }

    fn file_entry(&mut self, record: &FileRecord, depth: usize) -> Result<()> {
        writeln!(self.out, "{}├── {}", indent(depth), record.name())?;
        if let Some(content) = &record.content {
            writeln!(self.out, "{}Content:", indent(depth + 1))?;
            write!(self.out, "{}\n\n", content)?;
        }
        Ok(())
    }

    fn marker(&mut self, entry: Entry<'_>, marker: Marker) -> Result<()> {
        let pad = indent(entry.depth);
        match marker {
            Marker::Ignored => writeln!(self.out, "{}├── {} [Ignored]", pad, entry.name)?,
            Marker::Excluded(_) => writeln!(self.out, "{}├── {} [Excluded]", pad, entry.name)?,
            Marker::AccessError => {
                writeln!(self.out, "{}├── {} [Access Error]", pad, entry.name)?
            }
            Marker::ConversionFailed => writeln!(
                self.out,
                "{}├── {} [Notebook Conversion Error]",
                pad, entry.name
            )?,
            Marker::NotRegularFile => {
                writeln!(self.out, "{}├── {} [Not a regular file]", pad, entry.name)?
            }
            Marker::TokenLimit => {
                writeln!(self.out, "{}├── {}", pad, entry.name)?;
                write!(
                    self.out,
                    "{}[Content excluded due to token limit]\n\n",
                    indent(entry.depth + 1)
                )?;
            }
            Marker::ProcessingFailed => {
                writeln!(self.out, "{}├── {}", pad, entry.name)?;
                write!(self.out, "{}[Error processing file]\n\n", indent(entry.depth + 1))?;
            }
            Marker::PermissionDenied => {
                writeln!(self.out, "{}[Permission denied accessing directory]", pad)?
            }
            Marker::DirectoryError => writeln!(self.out, "{}[Error accessing directory]", pad)?,
        }
        Ok(())
    }

    fn leave_dir(&mut self, _entry: Entry<'_>) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

pub struct StructuredRenderer<W: Write> {
    out: W,
    generated: Option<String>,
}

impl<W: Write> StructuredRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            generated: None,
        }
    }

    pub fn with_generated(mut self, generated: Option<String>) -> Self {
        self.generated = generated;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn list_block(&mut self, tag: &str, item_tag: &str, items: &[String]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "<{}>", tag)?;
        for item in items {
            writeln!(self.out, "  <{0}>{1}</{0}>", item_tag, escape(item.as_str()))?;
        }
        writeln!(self.out, "</{}>", tag)?;
        Ok(())
    }
}

impl<W: Write> OutputStrategy for StructuredRenderer<W> {
    fn begin(&mut self, profile: &ProjectProfile) -> Result<()> {
        match &self.generated {
            Some(ts) => writeln!(self.out, "<codebase generated='{}'>", escape(ts.as_str()))?,
            None => writeln!(self.out, "<codebase>")?,
        }
        write!(
            self.out,
            "<project type='{}' language='{}'",
            escape(profile.project_type.as_str()),
            escape(profile.language.as_str())
        )?;
        if let Some(framework) = &profile.framework {
            write!(self.out, " framework='{}'", escape(framework.as_str()))?;
        }
        writeln!(self.out, ">")?;
        self.list_block("entry_points", "entry", &profile.entry_points)?;
        self.list_block("dependencies", "file", &profile.dependency_files)?;
        self.list_block("config_files", "file", &profile.config_files)?;
        self.list_block("build_files", "file", &profile.build_files)?;
        self.list_block("test_dirs", "dir", &profile.test_directories)?;
        writeln!(self.out, "</project>\n")?;
        writeln!(self.out, "<files>")?;
        Ok(())
    }

    fn enter_dir(&mut self, _entry: Entry<'_>) -> Result<()> {
        Ok(())
    }

    fn file_entry(&mut self, record: &FileRecord, _depth: usize) -> Result<()> {
        write!(
            self.out,
            "<file path='{}' size='{}' ext='{}'",
            escape(record.rel_path.as_str()),
            record.size,
            escape(record.extension.as_str())
        )?;
        if let Some(kind) = record.kind {
            write!(self.out, " kind='{}'", kind.as_str())?;
        }
        if record.executable {
            write!(self.out, " executable='true'")?;
        }
        if !record.imports.is_empty() {
            write!(self.out, " imports='{}'", escape(record.imports.join(",").as_str()))?;
        }
        writeln!(self.out, ">")?;

        let content = record.content.as_deref().unwrap_or_default();
        writeln!(self.out, "```")?;
        write!(self.out, "{}", content)?;
        if !content.ends_with('\n') {
            writeln!(self.out)?;
        }
        writeln!(self.out, "```")?;
        writeln!(self.out, "</file>\n")?;
        Ok(())
    }

    fn marker(&mut self, entry: Entry<'_>, marker: Marker) -> Result<()> {
        let path = escape(entry.rel_path);
        let size = entry
            .size
            .map(|s| format!(" size='{}'", s))
            .unwrap_or_default();
        match marker {
            Marker::Ignored => {}
            Marker::Excluded(reason) => writeln!(
                self.out,
                "<file path='{}'{} excluded='{}'/>",
                path,
                size,
                reason.as_str()
            )?,
            Marker::TokenLimit => writeln!(
                self.out,
                "<file path='{}'{} excluded='token_limit'/>",
                path, size
            )?,
            Marker::ProcessingFailed => writeln!(
                self.out,
                "<file path='{}'{} error='processing_failed'/>",
                path, size
            )?,
            Marker::ConversionFailed => writeln!(
                self.out,
                "<file path='{}'{} error='conversion_failed'/>",
                path, size
            )?,
            Marker::AccessError => {
                writeln!(self.out, "<file path='{}' error='access_error'/>", path)?
            }
            Marker::NotRegularFile => {
                writeln!(self.out, "<file path='{}' skipped='not_regular_file'/>", path)?
            }
            Marker::PermissionDenied => {
                writeln!(self.out, "<dir path='{}' error='permission_denied'/>", path)?
            }
            Marker::DirectoryError => {
                writeln!(self.out, "<dir path='{}' error='access_error'/>", path)?
            }
        }
        Ok(())
    }

    fn leave_dir(&mut self, _entry: Entry<'_>) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        writeln!(self.out, "</files>")?;
        writeln!(self.out, "</codebase>")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FileKind;

    fn record(rel: &str, content: Option<&str>) -> FileRecord {
        FileRecord {
            rel_path: rel.to_string(),
            size: content.map(|c| c.len() as u64).unwrap_or(0),
            extension: ".py".to_string(),
            executable: false,
            kind: Some(FileKind::Source),
            imports: vec!["os".to_string(), "sys".to_string()],
            content: content.map(str::to_string),
        }
    }

    fn entry<'a>(name: &'a str, rel: &'a str, depth: usize, size: Option<u64>) -> Entry<'a> {
        Entry {
            name,
            rel_path: rel,
            depth,
            size,
        }
    }

    #[test]
    fn test_tree_shapes() {
        let mut r = TreeRenderer::new(Vec::new());
        r.begin(&ProjectProfile::default()).unwrap();
        r.enter_dir(entry("src", "src", 0, None)).unwrap();
        r.file_entry(&record("src/main.py", Some("print(1)")), 1).unwrap();
        r.marker(entry("big.txt", "src/big.txt", 1, Some(9)), Marker::TokenLimit)
            .unwrap();
        r.leave_dir(entry("src", "src", 0, None)).unwrap();
        r.marker(entry("node_modules", "node_modules", 0, None), Marker::Ignored)
            .unwrap();
        r.marker(
            entry("data.csv", "data.csv", 0, Some(3)),
            Marker::Excluded(ExclusionReason::Extension),
        )
        .unwrap();
        r.end().unwrap();

        let text = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(
            text,
            "└── src/\n  ├── main.py\n    Content:\nprint(1)\n\n  ├── big.txt\n    [Content excluded due to token limit]\n\n├── node_modules [Ignored]\n├── data.csv [Excluded]\n"
        );
    }

    #[test]
    fn test_structured_document() {
        let profile = ProjectProfile {
            project_type: "python".to_string(),
            language: "python".to_string(),
            entry_points: vec!["src/main.py".to_string()],
            ..ProjectProfile::default()
        };
        let mut r = StructuredRenderer::new(Vec::new());
        r.begin(&profile).unwrap();
        r.enter_dir(entry("src", "src", 0, None)).unwrap();
        r.file_entry(&record("src/main.py", Some("print(1)\n")), 1).unwrap();
        r.marker(entry("ignored", "ignored", 0, None), Marker::Ignored)
            .unwrap();
        r.marker(entry("big.json", "big.json", 0, Some(5)), Marker::Excluded(ExclusionReason::JsonSize))
            .unwrap();
        r.marker(entry("huge.txt", "huge.txt", 0, Some(7)), Marker::TokenLimit)
            .unwrap();
        r.marker(entry("pipe", "run/pipe", 1, None), Marker::NotRegularFile)
            .unwrap();
        r.end().unwrap();

        let text = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(
            text,
            "<codebase>\n<project type='python' language='python'>\n<entry_points>\n  <entry>src/main.py</entry>\n</entry_points>\n</project>\n\n<files>\n<file path='src/main.py' size='9' ext='.py' kind='source' imports='os,sys'>\n```\nprint(1)\n```\n</file>\n\n<file path='big.json' size='5' excluded='json_size'/>\n<file path='huge.txt' size='7' excluded='token_limit'/>\n<file path='run/pipe' skipped='not_regular_file'/>\n</files>\n</codebase>\n"
        );
    }

    #[test]
    fn test_structured_escapes_attributes() {
        let mut r = StructuredRenderer::new(Vec::new()).with_generated(Some("2025-01-01T00:00:00Z".into()));
        r.begin(&ProjectProfile::default()).unwrap();
        r.file_entry(&record("it's<odd>.py", Some("x")), 0).unwrap();
        r.end().unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(text.starts_with("<codebase generated='2025-01-01T00:00:00Z'>\n"));
        assert!(text.contains("path='it&apos;s&lt;odd&gt;.py'"));
    }
}
