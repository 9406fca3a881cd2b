//! The student record as read from the relational source.
//!
//! Every field except the identity key is `Option<String>`. A present value is
//! never empty: [`Record::set`] turns `Some("")` into `None`, so "absent" and
//! "omit from the directory write" are the same thing in code.
//!
//! Two fixed tables hang off [`Field`]:
//! - [`Field::in_column_order`]: the source column order, which is also the
//!   fingerprint order. Changing it changes every fingerprint.
//! - [`ATTRIBUTE_MAP`]: the 1:1 field → directory attribute mapping.

use serde::{Deserialize, Serialize};

use crate::types::IdentityKey;

/// Number of source columns per record.
pub const FIELD_COUNT: usize = 52;

/// Study fields per study program (`f1`..`f4`).
pub const STUDY_FIELDS_PER_PROGRAM: u8 = 4;

// ---------------------------------------------------------------------------
// Field identifiers
// ---------------------------------------------------------------------------

/// One of the two study programs a student can be enrolled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    First,
    Second,
}

impl Program {
    pub const ALL: [Program; 2] = [Program::First, Program::Second];

    fn index(self) -> usize {
        match self {
            Program::First => 0,
            Program::Second => 1,
        }
    }

    /// 1-based number used in column and attribute names.
    pub fn number(self) -> usize {
        self.index() + 1
    }
}

/// The five parts of a study field, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudyPart {
    Name,
    SubjectCode,
    University,
    ExamVersion,
    Semester,
}

impl StudyPart {
    pub const ALL: [StudyPart; 5] = [
        StudyPart::Name,
        StudyPart::SubjectCode,
        StudyPart::University,
        StudyPart::ExamVersion,
        StudyPart::Semester,
    ];

    fn suffix(self) -> &'static str {
        match self {
            StudyPart::Name => "",
            StudyPart::SubjectCode => "fachkz",
            StudyPart::University => "hs",
            StudyPart::ExamVersion => "pvers",
            StudyPart::Semester => "sem",
        }
    }
}

/// A named record field.
///
/// `Study` carries a 1-based slot (`1..=STUDY_FIELDS_PER_PROGRAM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    DateOfBirth,
    Gender,
    Matriculation,
    StudentStatus,
    Semester,
    ChipSerial,
    Degree(Program),
    Study(Program, u8, StudyPart),
    Identity,
    Mail,
}

impl Field {
    /// Source column name.
    pub fn column_name(self) -> String {
        match self {
            Field::FirstName => "firstname".to_string(),
            Field::LastName => "lastname".to_string(),
            Field::DateOfBirth => "date_of_birth".to_string(),
            Field::Gender => "gender".to_string(),
            Field::Matriculation => "matrikel".to_string(),
            Field::StudentStatus => "mlustudstatus".to_string(),
            Field::Semester => "mlusemester".to_string(),
            Field::ChipSerial => "chipseriennr".to_string(),
            Field::Degree(program) => format!("mlustg{}abschl", program.number()),
            Field::Study(program, slot, part) => {
                format!("mlustg{}f{}{}", program.number(), slot, part.suffix())
            }
            Field::Identity => "nkz".to_string(),
            Field::Mail => "mail".to_string(),
        }
    }

    /// All fields in source column order.
    pub fn in_column_order() -> Vec<Field> {
        let mut fields = vec![
            Field::FirstName,
            Field::LastName,
            Field::DateOfBirth,
            Field::Gender,
            Field::Matriculation,
            Field::StudentStatus,
            Field::Semester,
            Field::ChipSerial,
        ];
        for program in Program::ALL {
            fields.push(Field::Degree(program));
            for slot in 1..=STUDY_FIELDS_PER_PROGRAM {
                for part in StudyPart::ALL {
                    fields.push(Field::Study(program, slot, part));
                }
            }
        }
        fields.push(Field::Identity);
        fields.push(Field::Mail);
        fields
    }
}

// ---------------------------------------------------------------------------
// Field → directory attribute table
// ---------------------------------------------------------------------------

use Program::{First, Second};
use StudyPart::{ExamVersion, Name, Semester as Sem, SubjectCode, University};

/// Source field → directory attribute name.
///
/// `chipseriennr` has no directory attribute. `cn`, `carlicense` and the
/// constant attributes are derived by the writer, not listed here.
pub const ATTRIBUTE_MAP: &[(Field, &str)] = &[
    (Field::Identity, "uid"),
    (Field::LastName, "sn"),
    (Field::FirstName, "givenname"),
    (Field::Mail, "mail"),
    (Field::StudentStatus, "mlustudstatus"),
    (Field::Gender, "schacgender"),
    (Field::DateOfBirth, "mlugebdat"),
    (Field::Matriculation, "mlumatrikel"),
    (Field::Semester, "mlusemester"),
    (Field::Degree(First), "mlustg1abschl"),
    (Field::Study(First, 1, Name), "mlustg1f1"),
    (Field::Study(First, 1, University), "mlustg1f1hs"),
    (Field::Study(First, 1, ExamVersion), "mlustg1f1pvers"),
    (Field::Study(First, 1, SubjectCode), "mlustg1f1fachkz"),
    (Field::Study(First, 1, Sem), "mlustg1f1sem"),
    (Field::Study(First, 2, Name), "mlustg1f2"),
    (Field::Study(First, 2, University), "mlustg1f2hs"),
    (Field::Study(First, 2, ExamVersion), "mlustg1f2pvers"),
    (Field::Study(First, 2, SubjectCode), "mlustg1f2fachkz"),
    (Field::Study(First, 2, Sem), "mlustg1f2sem"),
    (Field::Study(First, 3, Name), "mlustg1f3"),
    (Field::Study(First, 3, University), "mlustg1f3hs"),
    (Field::Study(First, 3, ExamVersion), "mlustg1f3pvers"),
    (Field::Study(First, 3, SubjectCode), "mlustg1f3fachkz"),
    (Field::Study(First, 3, Sem), "mlustg1f3sem"),
    (Field::Study(First, 4, Name), "mlustg1f4"),
    (Field::Study(First, 4, University), "mlustg1f4hs"),
    (Field::Study(First, 4, ExamVersion), "mlustg1f4pvers"),
    (Field::Study(First, 4, SubjectCode), "mlustg1f4fachkz"),
    (Field::Study(First, 4, Sem), "mlustg1f4sem"),
    (Field::Degree(Second), "mlustg2abschl"),
    (Field::Study(Second, 1, Name), "mlustg2f1"),
    (Field::Study(Second, 1, University), "mlustg2f1hs"),
    (Field::Study(Second, 1, ExamVersion), "mlustg2f1pvers"),
    (Field::Study(Second, 1, SubjectCode), "mlustg2f1fachkz"),
    (Field::Study(Second, 1, Sem), "mlustg2f1sem"),
    (Field::Study(Second, 2, Name), "mlustg2f2"),
    (Field::Study(Second, 2, University), "mlustg2f2hs"),
    (Field::Study(Second, 2, ExamVersion), "mlustg2f2pvers"),
    (Field::Study(Second, 2, SubjectCode), "mlustg2f2fachkz"),
    (Field::Study(Second, 2, Sem), "mlustg2f2sem"),
    (Field::Study(Second, 3, Name), "mlustg2f3"),
    (Field::Study(Second, 3, University), "mlustg2f3hs"),
    (Field::Study(Second, 3, ExamVersion), "mlustg2f3pvers"),
    (Field::Study(Second, 3, SubjectCode), "mlustg2f3fachkz"),
    (Field::Study(Second, 3, Sem), "mlustg2f3sem"),
    (Field::Study(Second, 4, Name), "mlustg2f4"),
    (Field::Study(Second, 4, University), "mlustg2f4hs"),
    (Field::Study(Second, 4, ExamVersion), "mlustg2f4pvers"),
    (Field::Study(Second, 4, SubjectCode), "mlustg2f4fachkz"),
    (Field::Study(Second, 4, Sem), "mlustg2f4sem"),
];

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One of the four study fields within a program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudyField {
    pub name: Option<String>,
    pub subject_code: Option<String>,
    pub university: Option<String>,
    pub exam_version: Option<String>,
    pub semester: Option<String>,
}

impl StudyField {
    fn part(&self, part: StudyPart) -> &Option<String> {
        match part {
            StudyPart::Name => &self.name,
            StudyPart::SubjectCode => &self.subject_code,
            StudyPart::University => &self.university,
            StudyPart::ExamVersion => &self.exam_version,
            StudyPart::Semester => &self.semester,
        }
    }

    fn part_mut(&mut self, part: StudyPart) -> &mut Option<String> {
        match part {
            StudyPart::Name => &mut self.name,
            StudyPart::SubjectCode => &mut self.subject_code,
            StudyPart::University => &mut self.university,
            StudyPart::ExamVersion => &mut self.exam_version,
            StudyPart::Semester => &mut self.semester,
        }
    }
}

/// A study program: degree plus up to four study fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudyProgram {
    pub degree: Option<String>,
    pub fields: [StudyField; STUDY_FIELDS_PER_PROGRAM as usize],
}

/// A student record, one per source row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub identity: IdentityKey,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub matriculation: Option<String>,
    pub student_status: Option<String>,
    pub semester: Option<String>,
    pub chip_serial: Option<String>,
    pub programs: [StudyProgram; 2],
    pub mail: Option<String>,
}

impl Record {
    pub fn new(identity: impl Into<IdentityKey>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    /// Build a record by asking `value_of` for every field in column order.
    pub fn from_fields<F>(mut value_of: F) -> Self
    where
        F: FnMut(Field) -> Option<String>,
    {
        let mut record = Self::default();
        for field in Field::in_column_order() {
            record.set(field, value_of(field));
        }
        record
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// Value of `field`, `None` when absent. An empty identity reads as `None`.
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Identity => Some(self.identity.as_str()).filter(|s| !s.is_empty()),
            Field::Degree(program) => self.programs[program.index()].degree.as_deref(),
            Field::Study(program, slot, part) => self
                .study_field(program, slot)
                .and_then(|f| f.part(part).as_deref()),
            other => self.scalar(other).and_then(|v| v.as_deref()),
        }
    }

    /// Set `field`. Empty strings are stored as `None`; whitespace is kept.
    ///
    /// Study slots outside `1..=STUDY_FIELDS_PER_PROGRAM` are ignored.
    pub fn set(&mut self, field: Field, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match field {
            Field::Identity => self.identity = IdentityKey(value.unwrap_or_default()),
            Field::Degree(program) => self.programs[program.index()].degree = value,
            Field::Study(program, slot, part) => {
                if let Some(study) = self.study_field_mut(program, slot) {
                    *study.part_mut(part) = value;
                }
            }
            other => {
                if let Some(slot) = self.scalar_mut(other) {
                    *slot = value;
                }
            }
        }
    }

    /// `"<first> <last>"` from whichever parts are present; `None` when both
    /// are absent, in which case the writer uses the identity as `cn`.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn study_field(&self, program: Program, slot: u8) -> Option<&StudyField> {
        let idx = usize::from(slot).checked_sub(1)?;
        self.programs[program.index()].fields.get(idx)
    }

    fn study_field_mut(&mut self, program: Program, slot: u8) -> Option<&mut StudyField> {
        let idx = usize::from(slot).checked_sub(1)?;
        self.programs[program.index()].fields.get_mut(idx)
    }

    fn scalar(&self, field: Field) -> Option<&Option<String>> {
        Some(match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Gender => &self.gender,
            Field::Matriculation => &self.matriculation,
            Field::StudentStatus => &self.student_status,
            Field::Semester => &self.semester,
            Field::ChipSerial => &self.chip_serial,
            Field::Mail => &self.mail,
            Field::Identity | Field::Degree(_) | Field::Study(..) => return None,
        })
    }

    fn scalar_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        Some(match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Gender => &mut self.gender,
            Field::Matriculation => &mut self.matriculation,
            Field::StudentStatus => &mut self.student_status,
            Field::Semester => &mut self.semester,
            Field::ChipSerial => &mut self.chip_serial,
            Field::Mail => &mut self.mail,
            Field::Identity | Field::Degree(_) | Field::Study(..) => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
