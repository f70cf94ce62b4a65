//! C# accessor code for the extracted tables.
//!
//! The output is a pure function of the schemas: the same schemas always
//! produce the same bytes.

use crate::error::RustyTableError;
use crate::extract::output::OutputError;
use crate::schema::PropertyType;
use crate::schema::SheetSchema;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

pub const GENERATED_FILE_NAME: &str = "GameTables.cs";

const HEADER: &str = "using System;
using System.Collections.Generic;
using System.Globalization;
using System.Linq;
using Newtonsoft.Json;

// Auto-generated code. Do not edit by hand.
";

const BASE_CLASS: &str = "public abstract class GameTable<T> where T : GameTable<T>, new()
{
    private static readonly Dictionary<string, T> _items = new();

    public static void LoadData(string json)
    {
        var data = JsonConvert.DeserializeObject<Dictionary<string, Dictionary<string, string>>>(json);
        foreach (var kvp in data)
        {
            var item = new T();
            item.Parse(kvp.Value);
            _items[kvp.Key] = item;
        }
    }

    protected abstract void Parse(Dictionary<string, string> data);

    public static IEnumerable<string> GetKeys() => _items.Keys;
    public static T Get(string key) => _items.GetValueOrDefault(key);
    public static IEnumerable<T> GetMany(IEnumerable<string> keys) => keys.Select(Get);
    public static IEnumerable<T> GetAll() => _items.Values;
    public static bool TryGet(string key, out T value) => _items.TryGetValue(key, out value);
    public static IEnumerable<T> Where(Func<T, bool> predicate) => _items.Values.Where(predicate);
}";

/// Generates `GameTables.cs` from data-sheet schemas.
pub struct CodeGenerator<'a> {
    schemas: Vec<&'a SheetSchema>,
}

impl<'a> CodeGenerator<'a> {
    /// Sheets sharing a name across workbooks produce one class, from the
    /// first of them.
    pub fn new(schemas: &'a [SheetSchema]) -> Self {
        let mut seen = HashSet::new();
        let schemas = schemas
            .iter()
            .filter(|schema| seen.insert(schema.sheet_name.as_str()))
            .collect();
        Self { schemas }
    }

    pub fn generate(&self) -> String {
        let classes: Vec<String> = self.schemas.iter().map(|schema| table_class(schema)).collect();
        [
            HEADER.to_owned(),
            BASE_CLASS.to_owned(),
            classes.join("\n\n"),
            self.manager_class(),
        ]
        .join("\n\n")
    }

    /// Writes the generated code into an existing directory.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, RustyTableError> {
        if !dir.is_dir() {
            Err(OutputError::DirectoryNotFound(dir.display().to_string()))?
        }
        let path = dir.join(GENERATED_FILE_NAME);
        std::fs::write(&path, self.generate())?;
        Ok(path)
    }

    fn manager_class(&self) -> String {
        let cases: Vec<String> = self
            .schemas
            .iter()
            .map(|schema| format!("case \"{0}\": {0}.LoadData(jsonData); break;", schema.sheet_name))
            .collect();
        let mut code = String::from(
            "public static class GameTableManager
{
    public static void LoadAllData(Dictionary<string, string> jsonDict)
    {
        foreach (var entry in jsonDict)
        {
            string tableName = entry.Key;
            string jsonData = entry.Value;
            switch (tableName)
            {
",
        );
        for case in cases {
            code.push_str(&format!("                {case}\n"));
        }
        code.push_str(
            "                default:
                    throw new InvalidOperationException($\"Unknown table name: {tableName}\");
            }
        }
    }
}",
        );
        code
    }
}

fn table_class(schema: &SheetSchema) -> String {
    let properties: Vec<String> = schema
        .value_properties()
        .map(|property| {
            format!(
                "{}\n    public {} {} {{ get; private set; }}",
                summary(&schema.property_descriptions[property]),
                schema.property_types[property].name(),
                schema.property_names[property]
            )
        })
        .collect();
    let statements: Vec<String> = schema
        .value_properties()
        .map(|property| {
            let name = &schema.property_names[property];
            format!("        {name} = {};", parse_expression(name, schema.property_types[property]))
        })
        .collect();

    format!(
        "public class {0} : GameTable<{0}>
{{
{1}

    protected override void Parse(Dictionary<string, string> data)
    {{
{2}
    }}
}}",
        schema.sheet_name,
        properties.join("\n\n"),
        statements.join("\n")
    )
}

/// XML doc summary; each description line gets its own `///` prefix.
fn summary(description: &str) -> String {
    let mut lines = vec!["    /// <summary>".to_owned()];
    let mut text: Vec<&str> = description.lines().map(str::trim_end).collect();
    if text.is_empty() {
        text.push("");
    }
    for line in text {
        match line {
            "" => lines.push("    ///".to_owned()),
            _ => lines.push(format!("    /// {}", escape_xml(line))),
        }
    }
    lines.push("    /// </summary>".to_owned());
    lines.join("\n")
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// C# expression parsing `data["name"]` as `kind`, matching the cell checks.
pub fn parse_expression(name: &str, kind: PropertyType) -> String {
    let value = format!("data[\"{name}\"]");
    match kind {
        PropertyType::String => value,
        PropertyType::Bool => format!("bool.Parse({value})"),
        PropertyType::DateTime => {
            format!("DateTime.ParseExact({value}, \"yyyy-MM-dd HH:mm:ss\", CultureInfo.InvariantCulture)")
        }
        PropertyType::TimeSpan => {
            format!("TimeSpan.ParseExact({value}, @\"hh\\:mm\\:ss\", CultureInfo.InvariantCulture)")
        }
        PropertyType::Int | PropertyType::Long | PropertyType::Float | PropertyType::Double => {
            format!("{}.Parse({value}, CultureInfo.InvariantCulture)", kind.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Sheet;
    use pretty_assertions::assert_eq;

    fn schema(sheet_name: &str, names: &[&str], types: &[PropertyType], descriptions: &[&str]) -> SheetSchema {
        SheetSchema {
            table_name: "Tables".to_owned(),
            sheet_name: sheet_name.to_owned(),
            row_count: 0,
            column_count: names.len(),
            property_names: names.iter().map(|name| name.to_string()).collect(),
            property_types: types.to_vec(),
            property_descriptions: descriptions.iter().map(|text| text.to_string()).collect(),
            primary_key: Some(0),
            foreign_keys: Vec::new(),
            sheet: Sheet::new("Tables.xlsx", sheet_name),
        }
    }

    fn item() -> SheetSchema {
        schema(
            "Item",
            &["pkey", "Name", "Price", "ReleasedAt"],
            &[PropertyType::Int, PropertyType::String, PropertyType::Long, PropertyType::DateTime],
            &["Key", "Display name\nshown in shops", "Price in gold", ""],
        )
    }

    #[test]
    fn table_class_skips_primary_key() {
        let code = table_class(&item());
        assert_eq!(
            code,
            "public class Item : GameTable<Item>
{
    /// <summary>
    /// Display name
    /// shown in shops
    /// </summary>
    public string Name { get; private set; }

    /// <summary>
    /// Price in gold
    /// </summary>
    public long Price { get; private set; }

    /// <summary>
    ///
    /// </summary>
    public DateTime ReleasedAt { get; private set; }

    protected override void Parse(Dictionary<string, string> data)
    {
        Name = data[\"Name\"];
        Price = long.Parse(data[\"Price\"], CultureInfo.InvariantCulture);
        ReleasedAt = DateTime.ParseExact(data[\"ReleasedAt\"], \"yyyy-MM-dd HH:mm:ss\", CultureInfo.InvariantCulture);
    }
}"
        );
    }

    #[test]
    fn parse_expressions() {
        assert_eq!(parse_expression("Hp", PropertyType::Int), "int.Parse(data[\"Hp\"], CultureInfo.InvariantCulture)");
        assert_eq!(parse_expression("Rate", PropertyType::Float), "float.Parse(data[\"Rate\"], CultureInfo.InvariantCulture)");
        assert_eq!(parse_expression("On", PropertyType::Bool), "bool.Parse(data[\"On\"])");
        assert_eq!(
            parse_expression("Cooldown", PropertyType::TimeSpan),
            "TimeSpan.ParseExact(data[\"Cooldown\"], @\"hh\\:mm\\:ss\", CultureInfo.InvariantCulture)"
        );
    }

    #[test]
    fn manager_dispatches_every_table_once() {
        let rarity = schema("Rarity", &["pkey", "Color"], &[PropertyType::String, PropertyType::String], &["", ""]);
        let schemas = vec![item(), rarity.clone(), rarity];
        let code = CodeGenerator::new(&schemas).generate();
        assert!(code.starts_with("using System;\n"));
        assert!(code.contains("case \"Item\": Item.LoadData(jsonData); break;"));
        assert_eq!(code.matches("case \"Rarity\"").count(), 1);
        assert_eq!(code.matches("public class Rarity").count(), 1);
        assert!(code.contains("throw new InvalidOperationException($\"Unknown table name: {tableName}\");"));
        assert!(code.find("public class Item").unwrap() < code.find("public class Rarity").unwrap());
    }

    #[test]
    fn generation_is_deterministic() {
        let schemas = vec![item()];
        let generator = CodeGenerator::new(&schemas);
        assert_eq!(generator.generate(), generator.generate());
        assert_eq!(generator.generate(), CodeGenerator::new(&[item()]).generate());
    }

    #[test]
    fn writes_into_existing_directory_only() {
        let schemas = vec![item()];
        let generator = CodeGenerator::new(&schemas);
        let dir = tempfile::tempdir().unwrap();
        let path = generator.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(GENERATED_FILE_NAME));
        assert_eq!(std::fs::read_to_string(path).unwrap(), generator.generate());
        assert!(generator.write_to(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn descriptions_are_escaped() {
        assert_eq!(summary("a < b"), "    /// <summary>\n    /// a &lt; b\n    /// </summary>");
    }
}
