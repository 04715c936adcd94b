//! Next-item resolution after a lesson is passed.

use crate::model::CourseOutline;
use crate::results::NextItem;

/// Find what unlocks after `lesson_id` is passed.
///
/// Cascades: next lesson in the same module, then the first lesson of the
/// next module that has any, then course completion. Returns `None` if the
/// lesson is not in the outline.
pub fn resolve_next(outline: &CourseOutline, lesson_id: &str) -> Option<NextItem> {
    let (module_index, lesson_index) =
        outline.modules.iter().enumerate().find_map(|(mi, module)| {
            module
                .lessons
                .iter()
                .position(|l| l == lesson_id)
                .map(|li| (mi, li))
        })?;

    let module = &outline.modules[module_index];
    if let Some(next) = module.lessons.get(lesson_index + 1) {
        return Some(NextItem::Lesson {
            module_id: module.id.clone(),
            lesson_id: next.clone(),
        });
    }

    let next_module = outline.modules[module_index + 1..]
        .iter()
        .find_map(|m| m.lessons.first().map(|first| (m, first)));

    Some(match next_module {
        Some((m, first)) => NextItem::Module {
            module_id: m.id.clone(),
            lesson_id: first.clone(),
        },
        None => NextItem::CourseComplete,
    })
}
