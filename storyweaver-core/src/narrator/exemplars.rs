//! Built-in few-shot exemplars.

use super::prompt::{ExampleCategory, FewShotExample};

const EXEMPLARS: [(ExampleCategory, &str, &str); 11] = [
    (
        ExampleCategory::Emotion,
        "Dread",
        "The silence in the house stretched, not peaceful, but taut like a wire about to snap. Every shadow seemed to lengthen, to whisper unseen threats. He knew, with a certainty that chilled him to the bone, that something was waiting. Something just beyond the edge of his perception.",
    ),
    (
        ExampleCategory::Emotion,
        "Obsession",
        "Her face filled every waking moment, and even bled into his dreams. He collected every discarded receipt, every stray hair, each a tiny fragment of her existence he could hold onto. It wasn't love, he told himself. It was\u{2026} understanding.",
    ),
    (
        ExampleCategory::Situation,
        "Locked door",
        "She rattled the handle again, a growing unease tightening her chest. It was her apartment. Her lock. But the bolt wouldn't budge. A faint scratching sound came from the other side. Not wood against metal. Something softer.",
    ),
    (
        ExampleCategory::Emotion,
        "Euphoria",
        "The world snapped into crystalline focus - every color vibrating, every sound a symphony. She laughed as raindrops hung suspended around her, each one a liquid diamond containing entire universes. This wasn't just happiness; it was revelation. The warning label on the pill bottle ('Do not operate heavy machinery') seemed hilariously inadequate now that she could see the machinery of existence itself.",
    ),
    (
        ExampleCategory::Emotion,
        "Betrayal",
        "The handwriting was unmistakable. Those looping g's, the dramatic cross on the t. His fingers trembled as they traced the words that dismantled twelve years of marriage. The note was signed with her pet name for him - the final twist of the knife. He'd always wondered what was in the locked drawer of her nightstand. Now he wished he'd never found the key.",
    ),
    (
        ExampleCategory::Emotion,
        "Awe",
        "The canyon didn't just stretch below him - it pulled at his soul. His breath came in shallow gasps as vertigo warred with wonder. A single misstep would send him tumbling into that magnificent void. His fingers dug into the sandstone as some primal part of his brain screamed that he wasn't meant to see things this beautiful and survive.",
    ),
    (
        ExampleCategory::Situation,
        "Unexpected package",
        "The box on his doorstep bore no postmark, no address - just his name written in what looked like charcoal. Inside, nestled in black velvet, was a childhood toy he distinctly remembered burning in his family's fireplace. The attached note read: 'You should have kept better track of your things.'",
    ),
    (
        ExampleCategory::Situation,
        "Broken mirror",
        "Seven years bad luck was the least of her worries. The cracks in the bathroom mirror didn't just distort her reflection - they showed versions of herself she'd never been. One reflection mouthed words she'd never say; another had scars she'd never received. The most disturbing one simply stared back, smiling with teeth that were just slightly too sharp.",
    ),
    (
        ExampleCategory::Situation,
        "Late-night phone call",
        "The phone rang at 3:17 AM. A voice she hadn't heard in twenty years said, 'I'm outside.' Her childhood best friend had drowned at summer camp. Yet when she pulled back the curtain, there she stood on the lawn - dripping wet, wearing the same swimsuit from that final day, holding out a sodden friendship bracelet.",
    ),
    (
        ExampleCategory::Situation,
        "Wrong number text",
        "'The body is hidden where we agreed,' read the message meant for someone else. She stared at the grainy photo attached - her own backyard shed. When she called the number, a familiar voice answered on the first ring: 'See? I told you you'd notice eventually.'",
    ),
    (
        ExampleCategory::Situation,
        "Stuck elevator",
        "The emergency call button sparked when he pressed it. In the sudden darkness, the elevator began moving - downward. The floor display showed B3, B4, B5... though the building only had two basement levels. A whisper came through the vents: 'You should've taken the stairs.'",
    ),
];

/// The default exemplars, in prompt order.
pub fn default_examples() -> Vec<FewShotExample> {
    EXEMPLARS
        .iter()
        .map(|(category, label, text)| FewShotExample::new(*category, *label, *text))
        .collect()
}
