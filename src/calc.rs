use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;

use crate::model::MarkRow;

/// Rendered in place of a mark or average that does not exist.
pub const PLACEHOLDER: &str = "-";

/// One cell of a class report: a recorded mark or the placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Mark(f64),
    Missing,
}

impl Cell {
    fn from_value(v: Option<f64>) -> Self {
        match v {
            Some(m) if m.is_finite() => Cell::Mark(m),
            _ => Cell::Missing,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Mark(v) => s.serialize_f64(*v),
            Cell::Missing => s.serialize_str(PLACEHOLDER),
        }
    }
}

/// Subject -> cell pairs in the class's subject order. Serializes as a JSON
/// object whose keys keep that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectCells(pub Vec<(String, Cell)>);

impl SubjectCells {
    pub fn get(&self, subject: &str) -> Option<Cell> {
        self.0.iter().find(|(s, _)| s == subject).map(|(_, c)| *c)
    }
}

impl Serialize for SubjectCells {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (subject, cell) in &self.0 {
            map.serialize_entry(subject, cell)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    pub student_name: String,
    pub student_class: String,
    pub roll_no: i64,
    pub marks: SubjectCells,
    pub average: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub class: String,
    pub subjects: Vec<String>,
    pub rows: Vec<StudentReportRow>,
}

/// Two-decimal rendering with halves rounded away from zero, so an average
/// of 80.125 shows as "80.13".
pub fn format_average(x: f64) -> String {
    format!("{:.2}", (x * 100.0).round() / 100.0)
}

/// Mean over the marks that are present; missing subjects do not count as 0.
pub fn student_average<I>(marks: I) -> Option<f64>
where
    I: IntoIterator<Item = Cell>,
{
    let mut sum = 0.0;
    let mut count: usize = 0;
    for c in marks {
        if let Cell::Mark(v) = c {
            sum += v;
            count += 1;
        }
    }
    if count > 0 {
        Some(sum / (count as f64))
    } else {
        None
    }
}

struct StudentAcc {
    name: String,
    class: String,
    roll_no: i64,
    marks: HashMap<String, Cell>,
}

struct ClassAcc {
    class: String,
    subjects: Vec<String>,
    students: Vec<StudentAcc>,
    student_index: HashMap<(String, i64), usize>,
}

/// Groups flat mark rows into one table per class.
///
/// Classes and subjects appear in order of first appearance in `rows`;
/// students are keyed by (name, class, roll number). `rows` is expected
/// newest first, so when a student has several rows for the same subject
/// the first one seen wins. Only classes that have at least one row appear
/// in the output.
pub fn aggregate_marks(rows: &[MarkRow]) -> Vec<ClassReport> {
    let mut classes: Vec<ClassAcc> = Vec::new();
    let mut class_index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let ci = *class_index
            .entry(row.student_class.clone())
            .or_insert_with(|| {
                classes.push(ClassAcc {
                    class: row.student_class.clone(),
                    subjects: Vec::new(),
                    students: Vec::new(),
                    student_index: HashMap::new(),
                });
                classes.len() - 1
            });
        let ClassAcc {
            subjects,
            students,
            student_index,
            ..
        } = &mut classes[ci];

        if !subjects.iter().any(|s| s == &row.subject_name) {
            subjects.push(row.subject_name.clone());
        }

        // The class is already fixed by the enclosing group.
        let key = (row.student_name.clone(), row.roll_no);
        let si = *student_index.entry(key).or_insert_with(|| {
            students.push(StudentAcc {
                name: row.student_name.clone(),
                class: row.student_class.clone(),
                roll_no: row.roll_no,
                marks: HashMap::new(),
            });
            students.len() - 1
        });
        students[si]
            .marks
            .entry(row.subject_name.clone())
            .or_insert_with(|| Cell::from_value(row.mark));
    }

    classes
        .into_iter()
        .map(|acc| {
            let rows = acc
                .students
                .into_iter()
                .map(|st| {
                    let cells: Vec<(String, Cell)> = acc
                        .subjects
                        .iter()
                        .map(|subject| {
                            let cell = st.marks.get(subject).copied().unwrap_or(Cell::Missing);
                            (subject.clone(), cell)
                        })
                        .collect();
                    let average = student_average(cells.iter().map(|(_, c)| *c))
                        .map(format_average)
                        .unwrap_or_else(|| PLACEHOLDER.to_string());
                    StudentReportRow {
                        student_name: st.name,
                        student_class: st.class,
                        roll_no: st.roll_no,
                        marks: SubjectCells(cells),
                        average,
                    }
                })
                .collect();
            ClassReport {
                class: acc.class,
                subjects: acc.subjects,
                rows,
            }
        })
        .collect()
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_cell(c: Cell) -> String {
    match c {
        Cell::Mark(v) => v.to_string(),
        Cell::Missing => PLACEHOLDER.to_string(),
    }
}

/// One CSV block per class (header + rows), blocks separated by a blank line.
pub fn reports_to_csv(reports: &[ClassReport]) -> String {
    let mut csv = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            csv.push('\n');
        }
        let mut header = vec![
            "class".to_string(),
            "student_name".to_string(),
            "roll_no".to_string(),
        ];
        header.extend(report.subjects.iter().map(|s| csv_quote(s)));
        header.push("average".to_string());
        csv.push_str(&header.join(","));
        csv.push('\n');

        for row in &report.rows {
            let mut fields = vec![
                csv_quote(&report.class),
                csv_quote(&row.student_name),
                row.roll_no.to_string(),
            ];
            fields.extend(row.marks.0.iter().map(|(_, c)| csv_cell(*c)));
            fields.push(row.average.clone());
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }
    }
    csv
}
