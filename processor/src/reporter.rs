/*
Copyright 2021 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::error::{DiagnosticItem, Messager, Severity};
use serde::{Deserialize, Serialize};
use stiletto_common::elements::{AnnotationData, ElementId};

/// Diagnostics accumulated about one root element, with nested sub-reports
/// that flatten on render. The single sink for user-visible validation
/// output.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ValidationReport {
    pub root: ElementId,
    pub items: Vec<DiagnosticItem>,
    pub subreports: Vec<ValidationReport>,
}

impl ValidationReport {
    pub fn about(root: ElementId) -> ValidationReportBuilder {
        ValidationReportBuilder {
            report: ValidationReport {
                root,
                items: Vec::new(),
                subreports: Vec::new(),
            },
        }
    }

    /// No errors anywhere, sub-reports included. Warnings and notes do not
    /// count against cleanliness.
    pub fn is_clean(&self) -> bool {
        self.items.iter().all(|i| i.severity != Severity::Error)
            && self.subreports.iter().all(ValidationReport::is_clean)
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
            + self
                .subreports
                .iter()
                .map(ValidationReport::error_count)
                .sum::<usize>()
    }

    /// Renders every item, depth first, into the host's channel.
    pub fn print_to(&self, messager: &mut dyn Messager) {
        for item in &self.items {
            messager.report(item.clone());
        }
        for subreport in &self.subreports {
            subreport.print_to(messager);
        }
    }
}

#[derive(Debug)]
pub struct ValidationReportBuilder {
    report: ValidationReport,
}

impl ValidationReportBuilder {
    pub fn root(&self) -> ElementId {
        self.report.root
    }

    pub fn error(&mut self, message: String, anchor: ElementId) -> &mut Self {
        self.report.items.push(DiagnosticItem::error(message, anchor));
        self
    }

    pub fn warning(&mut self, message: String, anchor: ElementId) -> &mut Self {
        self.report
            .items
            .push(DiagnosticItem::warning(message, anchor));
        self
    }

    pub fn note(&mut self, message: String, anchor: ElementId) -> &mut Self {
        self.report.items.push(DiagnosticItem::note(message, anchor));
        self
    }

    pub fn item(
        &mut self,
        severity: Severity,
        message: String,
        anchor: ElementId,
    ) -> &mut Self {
        self.report.items.push(DiagnosticItem {
            severity,
            message,
            anchor,
            sub_anchor: None,
        });
        self
    }

    pub fn item_with_sub_anchor(
        &mut self,
        severity: Severity,
        message: String,
        anchor: ElementId,
        sub_anchor: AnnotationData,
    ) -> &mut Self {
        self.report.items.push(
            DiagnosticItem {
                severity,
                message,
                anchor,
                sub_anchor: None,
            }
            .with_sub_anchor(sub_anchor),
        );
        self
    }

    pub fn add_subreport(&mut self, subreport: ValidationReport) -> &mut Self {
        self.report.subreports.push(subreport);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.report.is_clean()
    }

    pub fn build(self) -> ValidationReport {
        self.report
    }
}
