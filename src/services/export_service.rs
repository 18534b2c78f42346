use crate::error::Result;
use crate::models::exam_result::ResultSummary;
use rust_xlsxwriter::*;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

impl ExportService {
    /// Styled XLSX workbook of a teacher's results, in the given order.
    pub fn generate_results_xlsx(results: &[ResultSummary]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Results")?;

        let primary_color = Color::RGB(0x1E293B);
        let header_bg = Color::RGB(0x0F172A);
        let alt_row_1 = Color::RGB(0xF8FAFC);
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0);

        let score_high = Color::RGB(0x10B981);
        let score_mid = Color::RGB(0xF59E0B);
        let score_low = Color::RGB(0xEF4444);

        let columns = [
            ("#", 6.0),
            ("Exam", 32.0),
            ("Student", 28.0),
            ("PIN", 8.0),
            ("Score (%)", 12.0),
            ("Correct", 10.0),
            ("Total", 10.0),
            ("Completed", 20.0),
        ];
        let last_col = (columns.len() - 1) as u16;

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 36)?;
        worksheet.merge_range(0, 0, 0, last_col, "Exam results", &title_format)?;

        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(1, 22)?;
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        let subtitle = format!("Exported {}  •  {} results", now, results.len());
        worksheet.merge_range(1, 0, 1, last_col, &subtitle, &subtitle_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 2;
        worksheet.set_row_height(header_row, 26)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let data_start_row = 3;
        for (idx, result) in results.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);

            worksheet.set_row_height(row, 20)?;
            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &result.exam_title, &base_fmt)?;
            worksheet.write_string_with_format(
                row,
                2,
                &result.student_name,
                &base_fmt.clone().set_bold(),
            )?;
            worksheet.write_string_with_format(row, 3, &result.student_pin, &center_fmt)?;

            let score_color = if result.score >= 80.0 {
                score_high
            } else if result.score >= 50.0 {
                score_mid
            } else {
                score_low
            };
            let score_fmt = center_fmt
                .clone()
                .set_bold()
                .set_font_color(score_color)
                .set_num_format("0.00");
            worksheet.write_number_with_format(row, 4, result.score, &score_fmt)?;
            worksheet.write_number_with_format(row, 5, result.correct_answers as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 6, result.total_questions as f64, &center_fmt)?;

            let completed = result.completed_at.format("%Y-%m-%d %H:%M").to_string();
            worksheet.write_string_with_format(row, 7, &completed, &center_fmt)?;
        }

        let total_row = data_start_row + results.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let average = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        worksheet.set_row_height(total_row, 24)?;
        worksheet.merge_range(
            total_row,
            0,
            total_row,
            3,
            &format!("Total: {} results", results.len()),
            &summary_fmt,
        )?;
        worksheet.merge_range(
            total_row,
            4,
            total_row,
            last_col,
            &format!("Average score: {:.2}%", average),
            &summary_fmt,
        )?;

        worksheet.set_freeze_panes(3, 0)?;
        worksheet.autofilter(
            header_row,
            0,
            (data_start_row + results.len() as u32).saturating_sub(1).max(header_row),
            last_col,
        )?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn writes_a_zip_container() {
        let rows = vec![ResultSummary {
            exam_title: "Animals".into(),
            student_name: "Lena".into(),
            student_pin: "4821".into(),
            score: 75.0,
            total_questions: 4,
            correct_answers: 3,
            completed_at: Utc::now(),
        }];
        let bytes = ExportService::generate_results_xlsx(&rows).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_listing_still_exports() {
        let bytes = ExportService::generate_results_xlsx(&[]).unwrap();
        assert!(!bytes.is_empty());
    }
}
